//! Device identity keys and pairing data generation.

use crate::codec::DEFAULT_UNDEF;
use crate::record::Record;
use log::{debug, warn};
use rand::Rng;
use std::collections::HashSet;

/// Registry size after which colliding old protocol identities are accepted
pub const REGISTRY_RETRY_LIMIT: usize = 200;

/// How a decoded record is turned into an identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityScheme {
    /// `"{address}:{channel}:{unit}"`
    AddressChannelUnit,
    /// The address alone, one remote drives many units
    Address,
}

/// Identity of `record` under `scheme`, `None` if a needed field is missing
pub fn derive(record: &Record, scheme: IdentityScheme) -> Option<String> {
    let address = record.address.as_ref()?;
    match scheme {
        IdentityScheme::Address => Some(address.clone()),
        IdentityScheme::AddressChannelUnit => Some(format!(
            "{}:{}:{}",
            address,
            record.channel.as_ref()?,
            record.unit.as_ref()?
        )),
    }
}

/// Identities already handed out to old protocol devices
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    ids: HashSet<String>,
}

impl IdentityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as used
    pub fn register(&mut self, id: &str) {
        self.ids.insert(id.to_string());
    }

    /// True if `id` was registered
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Number of registered identities
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing was registered
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn random_bits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| if rng.gen_bool(0.5) { '1' } else { '0' })
        .collect()
}

/// Random pairing data for the 32 bit protocol
pub fn generate_data<R: Rng + ?Sized>(rng: &mut R) -> Record {
    let mut record = Record {
        address: Some(random_bits(rng, 26)),
        group: Some(0),
        channel: Some(random_bits(rng, 2)),
        unit: Some(random_bits(rng, 2)),
        state: Some(0),
        onoff: Some(false),
        ..Default::default()
    };
    record.id = derive(&record, IdentityScheme::AddressChannelUnit);
    record
}

/// Generated old protocol pairing data together with the codewheel positions to show
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedOld {
    /// Pairing record
    pub record: Record,
    /// Address wheel and unit+channel wheel
    pub codewheel_indexes: [u32; 2],
}

/// Random old protocol pairing data avoiding identities in `registry`.
///
/// Once the registry holds [`REGISTRY_RETRY_LIMIT`] entries a collision is accepted.
pub fn generate_old_data<R: Rng + ?Sized>(rng: &mut R, registry: &IdentityRegistry) -> GeneratedOld {
    loop {
        let address = random_bits(rng, 4);
        let channel = random_bits(rng, 2);
        let unit = random_bits(rng, 2);
        let id = format!("{}:{}:{}", address, channel, unit);
        if registry.contains(&id) {
            if registry.len() < REGISTRY_RETRY_LIMIT {
                debug!("Generated id {} already in use, retrying", id);
                continue;
            }
            warn!("Accepting duplicate id {}, registry is full", id);
        }
        let codewheel_indexes = [
            u32::from_str_radix(&address, 2).unwrap_or_default(),
            u32::from_str_radix(&format!("{}{}", channel, unit), 2).unwrap_or_default(),
        ];
        let record = Record {
            address: Some(address),
            channel: Some(channel),
            unit: Some(unit),
            undef: Some(DEFAULT_UNDEF.to_vec()),
            state: Some(0),
            id: Some(id),
            ..Default::default()
        };
        return GeneratedOld {
            record,
            codewheel_indexes,
        };
    }
}
