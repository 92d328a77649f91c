//! # Address Router
//!
//! Holds the (pattern, mask) → endpoint table. An address selects a binding
//! when `address & mask == pattern`. Bindings are checked pairwise disjoint
//! when they are registered, so at runtime at most one binding matches any
//! address and the output line has at most one driver.
//!
//! ## Overlap Test
//!
//! Two masked ranges share an address iff their patterns agree on every bit
//! that both masks constrain:
//!
//! ```text
//! (pattern_a ^ pattern_b) & mask_a & mask_b == 0   →  overlap
//! ```
//!
//! Bits constrained by only one mask are wildcards on the other side and can
//! always be chosen to satisfy both.

use heapless::Vec;
use log::debug;

use crate::config::FrameLayout;
use crate::endpoint::{Cycle, Endpoint};
use crate::error::ConfigError;
use crate::MAX_BINDINGS;

/// One entry of the address map
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Binding {
    pattern: u8,
    mask: u8,
    endpoint: Endpoint,
}

impl Binding {
    /// Pattern the masked address must equal (already masked)
    #[inline]
    pub const fn pattern(&self) -> u8 {
        self.pattern
    }

    /// Address bits the binding decodes
    #[inline]
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    /// The bound endpoint
    #[inline]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Mutable access to the bound endpoint
    #[inline]
    pub fn endpoint_mut(&mut self) -> &mut Endpoint {
        &mut self.endpoint
    }

    /// Whether `address` selects this binding
    #[inline]
    pub const fn matches(&self, address: u8) -> bool {
        address & self.mask == self.pattern
    }

    /// Whether this binding shares any address with `(pattern, mask)`
    #[inline]
    pub const fn overlaps(&self, pattern: u8, mask: u8) -> bool {
        (self.pattern ^ pattern) & self.mask & mask == 0
    }
}

/// Address map and dispatcher
#[derive(Debug, Clone)]
pub struct Router {
    layout: FrameLayout,
    bindings: Vec<Binding, MAX_BINDINGS>,
}

impl Router {
    /// Create an empty router for frames of `layout`
    pub const fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            bindings: Vec::new(),
        }
    }

    /// Add a binding, rejecting anything that could make routing ambiguous
    pub fn register(
        &mut self,
        pattern: u8,
        mask: u8,
        endpoint: Endpoint,
    ) -> Result<(), ConfigError> {
        let address_mask = self.layout.address_mask();
        if (pattern | mask) & !address_mask != 0 {
            return Err(ConfigError::AddressOutOfRange {
                pattern,
                mask,
                width: self.layout.address_width,
            });
        }
        endpoint.validate(mask, &self.layout)?;

        let pattern = pattern & mask;
        if let Some(other) = self.bindings.iter().find(|b| b.overlaps(pattern, mask)) {
            return Err(ConfigError::Overlap {
                pattern,
                mask,
                other_pattern: other.pattern,
                other_mask: other.mask,
            });
        }

        let kind = endpoint.kind();
        self.bindings
            .push(Binding {
                pattern,
                mask,
                endpoint,
            })
            .map_err(|_| ConfigError::RegistryFull {
                capacity: MAX_BINDINGS,
            })?;

        debug!(
            "bound {:?} at {:#04x}/{:#04x} ({} of {})",
            kind,
            pattern,
            mask,
            self.bindings.len(),
            MAX_BINDINGS
        );
        Ok(())
    }

    /// Index of the binding selected by `address`
    pub fn resolve(&self, address: u8) -> Option<usize> {
        self.bindings.iter().position(|b| b.matches(address))
    }

    /// Number of bindings selected by `address` (0 or 1 by construction)
    pub fn match_count(&self, address: u8) -> usize {
        self.bindings.iter().filter(|b| b.matches(address)).count()
    }

    /// Present a cycle to every endpoint
    ///
    /// Each endpoint learns whether its binding matches the cycle's address;
    /// cycles without an address select nobody. Returns the read value of the
    /// matching endpoint, if it produced one.
    pub fn dispatch(&mut self, cycle: &Cycle) -> Option<u32> {
        let address = match *cycle {
            Cycle::AddressKnown { address } => Some(address),
            Cycle::Commit(txn) => Some(txn.address),
            Cycle::Release | Cycle::Abort | Cycle::Lines { .. } => None,
        };
        let mut load = None;
        for binding in self.bindings.iter_mut() {
            let selected = address.is_some_and(|a| binding.matches(a));
            if let Some(value) = binding.endpoint.on_transaction(cycle, selected) {
                load = Some(value);
            }
        }
        load
    }

    /// Level driven onto the output line by a selected relay, if any
    pub fn output(&self) -> Option<bool> {
        self.bindings.iter().find_map(|b| b.endpoint.output())
    }

    /// Endpoint selected by `address`
    pub fn endpoint(&self, address: u8) -> Option<&Endpoint> {
        self.bindings
            .iter()
            .find(|b| b.matches(address))
            .map(|b| &b.endpoint)
    }

    /// Mutable endpoint selected by `address`
    pub fn endpoint_mut(&mut self, address: u8) -> Option<&mut Endpoint> {
        self.bindings
            .iter_mut()
            .find(|b| b.matches(address))
            .map(|b| &mut b.endpoint)
    }

    /// All bindings in registration order
    #[inline]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Mutable bindings in registration order
    #[inline]
    pub fn bindings_mut(&mut self) -> &mut [Binding] {
        &mut self.bindings
    }

    /// Frame layout the router was built for
    #[inline]
    pub const fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Number of bindings
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no endpoint is bound
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{GroupEndpoint, PassThroughEndpoint, RegisterEndpoint};

    fn reg() -> Endpoint {
        RegisterEndpoint::read_write(16).into()
    }

    fn canonical() -> Router {
        let mut router = Router::new(FrameLayout::CANONICAL);
        for i in 0..4 {
            router.register(i, 0x0F, reg()).unwrap();
        }
        for i in 4..12 {
            router
                .register(i, 0x0F, PassThroughEndpoint::new().into())
                .unwrap();
        }
        router
            .register(12, 0x0C, GroupEndpoint::new().into())
            .unwrap();
        router
    }

    #[test]
    fn test_identical_binding_rejected() {
        let mut router = Router::new(FrameLayout::CANONICAL);
        router.register(0x0, 0x0F, reg()).unwrap();
        assert_eq!(
            router.register(0x0, 0x0F, reg()),
            Err(ConfigError::Overlap {
                pattern: 0,
                mask: 0x0F,
                other_pattern: 0,
                other_mask: 0x0F
            })
        );
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_wildcard_overlap_rejected() {
        let mut router = Router::new(FrameLayout::CANONICAL);
        router.register(0x04, 0x0F, reg()).unwrap();
        // 0b01xx covers 4..7
        assert!(matches!(
            router.register(0x04, 0x0C, GroupEndpoint::new().into()),
            Err(ConfigError::Overlap { .. })
        ));
        // different fixed bit: disjoint
        assert!(router
            .register(0x08, 0x0C, GroupEndpoint::new().into())
            .is_ok());
    }

    #[test]
    fn test_disjoint_masks_on_distinct_bits_overlap() {
        // 1xxxxxx and xxxxxx1 share 1xxxxx1
        let mut router = Router::new(FrameLayout::CANONICAL);
        router.register(0x40, 0x40, reg()).unwrap();
        assert!(router.register(0x01, 0x01, reg()).is_err());
    }

    #[test]
    fn test_pattern_bits_outside_mask_are_dropped() {
        let mut router = Router::new(FrameLayout::CANONICAL);
        router.register(0x13, 0x0F, reg()).unwrap();
        assert_eq!(router.bindings()[0].pattern(), 0x03);
        assert_eq!(router.resolve(0x73), Some(0));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut router = Router::new(FrameLayout::CANONICAL);
        assert_eq!(
            router.register(0x80, 0xFF, reg()),
            Err(ConfigError::AddressOutOfRange {
                pattern: 0x80,
                mask: 0xFF,
                width: 7
            })
        );
    }

    #[test]
    fn test_registry_full() {
        let mut router = Router::new(FrameLayout::CANONICAL);
        for i in 0..MAX_BINDINGS as u8 {
            router.register(i, 0x7F, reg()).unwrap();
        }
        assert_eq!(
            router.register(0x7F, 0x7F, reg()),
            Err(ConfigError::RegistryFull {
                capacity: MAX_BINDINGS
            })
        );
    }

    #[test]
    fn test_routing_is_total_and_deterministic() {
        let router = canonical();
        for address in 0..=0x7Fu8 {
            assert_eq!(router.match_count(address), 1, "address {address:#04x}");
        }
        // upper three bits are ignored
        assert_eq!(router.resolve(0x75), router.resolve(0x05));
        assert_eq!(router.resolve(0x0E), Some(12));
    }

    #[test]
    fn test_unbound_address_matches_nothing() {
        let mut router = Router::new(FrameLayout::CANONICAL);
        router.register(0, 0x0F, reg()).unwrap();
        assert_eq!(router.match_count(1), 0);
        assert!(router.endpoint(1).is_none());
    }

    #[test]
    fn test_dispatch_reads_selected_register() {
        let mut router = canonical();
        router
            .endpoint_mut(2)
            .and_then(Endpoint::as_register_mut)
            .unwrap()
            .write(0x00F0);
        assert_eq!(router.dispatch(&Cycle::AddressKnown { address: 2 }), Some(0x00F0));
        assert_eq!(router.dispatch(&Cycle::AddressKnown { address: 5 }), None);
        assert_eq!(router.output(), Some(false));
    }
}
