//! Auxiliary group endpoint (Almazny mezzanine)
//!
//! Four shift-register sub-targets share one clock and one data line. The low
//! two address bits pick the sub-target whose latch is pulled low for the data
//! phase; its rising edge at the end of the frame is the commit strobe.
//! Latches of the other sub-targets stay high, and a high level alone is never
//! a strobe: only the counted rising transitions are. An aborted frame
//! returns the latch high without a strobe.

use super::{Cycle, PassThroughEndpoint};

/// Number of sub-targets behind one group endpoint
pub const GROUP_SIZE: usize = 4;

/// Address bits selecting the sub-target
pub(crate) const INDEX_MASK: u8 = (GROUP_SIZE - 1) as u8;

/// Group endpoint with per-sub-target latch strobes
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroupEndpoint {
    link: PassThroughEndpoint,
    last_index: u8,
    latch: [bool; GROUP_SIZE],
    strobes: [u32; GROUP_SIZE],
    taken: [u32; GROUP_SIZE],
}

impl GroupEndpoint {
    /// Create a group with all latches idle (high)
    pub const fn new() -> Self {
        Self {
            link: PassThroughEndpoint::fan_out(),
            last_index: 0,
            latch: [true; GROUP_SIZE],
            strobes: [0; GROUP_SIZE],
            taken: [0; GROUP_SIZE],
        }
    }

    /// Shared serial link (clock, fan-out data-in, local select)
    #[inline]
    pub const fn link(&self) -> &PassThroughEndpoint {
        &self.link
    }

    /// Mutable access to the shared link, for feeding back device output
    #[inline]
    pub fn link_mut(&mut self) -> &mut PassThroughEndpoint {
        &mut self.link
    }

    /// Sub-target addressed by the most recent group transaction
    #[inline]
    pub const fn last_index(&self) -> u8 {
        self.last_index
    }

    /// Current level of a latch line; `None` for an index outside the group
    pub fn latch(&self, index: usize) -> Option<bool> {
        self.latch.get(index).copied()
    }

    /// All latch levels
    #[inline]
    pub const fn latches(&self) -> [bool; GROUP_SIZE] {
        self.latch
    }

    /// Rising transitions seen on a latch since creation
    pub fn strobes(&self, index: usize) -> u32 {
        self.strobes.get(index).copied().unwrap_or(0)
    }

    /// Consume one pending strobe of a latch
    ///
    /// Returns true once per rising transition, however long the latch then
    /// stays high.
    pub fn take_strobe(&mut self, index: usize) -> bool {
        match (self.strobes.get(index), self.taken.get_mut(index)) {
            (Some(&seen), Some(taken)) if *taken < seen => {
                *taken += 1;
                true
            }
            _ => false,
        }
    }

    pub(super) fn on_transaction(&mut self, cycle: &Cycle, selected: bool) {
        if let Cycle::AddressKnown { address } = *cycle {
            if selected {
                self.last_index = address & INDEX_MASK;
            }
        }
        self.link.on_transaction(cycle, selected);
        self.update_latches(*cycle != Cycle::Abort);
    }

    fn update_latches(&mut self, strobe: bool) {
        let selected = self.link.local_select();
        for (index, latch) in self.latch.iter_mut().enumerate() {
            let level = !(selected && index == self.last_index as usize);
            if strobe && level && !*latch {
                self.strobes[index] += 1;
            }
            *latch = level;
        }
    }
}

impl Default for GroupEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(group: &mut GroupEndpoint, address: u8) {
        group.on_transaction(&Cycle::AddressKnown { address }, true);
        group.on_transaction(&Cycle::Release, false);
    }

    #[test]
    fn test_latch_low_during_data_phase() {
        let mut group = GroupEndpoint::new();
        group.on_transaction(&Cycle::AddressKnown { address: 14 }, true);
        assert_eq!(group.last_index(), 2);
        assert_eq!(group.latches(), [true, true, false, true]);

        group.on_transaction(&Cycle::Release, false);
        assert_eq!(group.latches(), [true; GROUP_SIZE]);
        assert_eq!(group.strobes(2), 1);
    }

    #[test]
    fn test_abort_releases_latch_without_strobe() {
        let mut group = GroupEndpoint::new();
        group.on_transaction(&Cycle::AddressKnown { address: 14 }, true);
        assert_eq!(group.latch(2), Some(false));

        group.on_transaction(&Cycle::Abort, false);
        assert_eq!(group.latches(), [true; GROUP_SIZE]);
        assert_eq!(group.strobes(2), 0);
        assert!(!group.take_strobe(2));
        assert!(group.link().abort_pending());
    }

    #[test]
    fn test_only_addressed_latch_strobes() {
        let mut group = GroupEndpoint::new();
        frame(&mut group, 12);
        frame(&mut group, 13);

        assert_eq!(group.strobes(0), 1);
        assert_eq!(group.strobes(1), 1);
        assert_eq!(group.strobes(2), 0);
        assert_eq!(group.latch(0), Some(true));
    }

    #[test]
    fn test_take_strobe_once_per_edge() {
        let mut group = GroupEndpoint::new();
        frame(&mut group, 12);
        assert!(group.take_strobe(0));
        assert!(!group.take_strobe(0));
        // held high, still no new strobe
        group.on_transaction(
            &Cycle::Lines {
                clock: true,
                data_in: true,
            },
            false,
        );
        assert!(!group.take_strobe(0));
        assert!(!group.take_strobe(GROUP_SIZE));
    }

    #[test]
    fn test_unselected_frame_keeps_last_index() {
        let mut group = GroupEndpoint::new();
        frame(&mut group, 15);
        group.on_transaction(&Cycle::AddressKnown { address: 4 }, false);
        assert_eq!(group.last_index(), 3);
        assert_eq!(group.latches(), [true; GROUP_SIZE]);
    }

    #[test]
    fn test_link_is_fan_out() {
        let group = GroupEndpoint::new();
        assert!(group.link().is_fan_out());
        assert_eq!(group.latch(4), None);
    }
}
