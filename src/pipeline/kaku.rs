use super::{ClearFields, Stage, StageContext};
use crate::families::Family;
use crate::record::{Capability, CapabilityValue, Dim, Record};
use log::trace;

/// Dim level sent with a bare "on" so the receiver always gets a nibble
const FALLBACK_DIM: f64 = 0.05;

/// Selects the frame family and tracks the last accepted frame.
pub struct Kaku {
    family: Family,
    clear: ClearFields,
    last_frame: Option<Record>,
}

impl Kaku {
    /// Stage for `family`, clearing `clear` from send objects
    pub fn new(family: Family, clear: ClearFields) -> Self {
        Kaku {
            family,
            clear,
            last_frame: None,
        }
    }
}

impl Stage for Kaku {
    fn name(&self) -> &'static str {
        "kaku"
    }

    fn family(&self) -> Option<Family> {
        Some(self.family)
    }

    fn clear_fields(&self) -> Option<ClearFields> {
        Some(self.clear)
    }

    fn on_data(&mut self, _ctx: &mut StageContext<'_>, record: Record) -> Option<Record> {
        // Group frames always carry unit 00, keep the unit of the last addressed frame
        match &mut self.last_frame {
            Some(last) if record.is_group() => last.group = record.group,
            last => *last = Some(record.clone()),
        }
        trace!("Last frame {:?}", self.last_frame);
        Some(record)
    }

    fn last_frame(&self) -> Option<&Record> {
        self.last_frame.as_ref()
    }
}

/// Dimmer leaf: dim protocol and an implicit dim level on "on".
pub struct Dimmer;

impl Stage for Dimmer {
    fn name(&self) -> &'static str {
        "dimmer"
    }

    fn family(&self) -> Option<Family> {
        Some(Family::P36Dim)
    }

    fn outbound(&mut self, ctx: &mut StageContext<'_>, mut record: Record) -> Record {
        if record.onoff == Some(true)
            && record.dim.is_none()
            && ctx.device.has_capability(Capability::Dim)
        {
            let level = match ctx.device.values.get(&Capability::Dim) {
                Some(CapabilityValue::Dim(Dim::Level(l))) if *l != 0.0 => *l,
                _ => FALLBACK_DIM,
            };
            record.dim = Some(Dim::Level(level));
        }
        record
    }
}
