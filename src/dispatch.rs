//! Per-layer dispatch sequencing.
//!
//! Layer `i+1` reads the neuron values layer `i` wrote — a genuine
//! read-after-write hazard across parallel invocation groups. The
//! orchestrator therefore issues exactly one invocation batch per
//! forwarding layer, in strictly increasing layer order, with a full
//! synchronization barrier between consecutive dispatches.

use crate::device::ComputeDevice;
use crate::error::FlatnetResult;
use crate::layout::NetworkLayout;

/// Fixed invocation-group width of the compute kernel.
pub const GROUP_WIDTH: usize = 32;

/// Computes the invocation-group count covering `total` elements.
///
/// Ceiling division: a partially filled trailing group is still
/// dispatched, otherwise its destination neurons would never be
/// computed.
#[inline]
pub fn workgroup_count(total: usize, group_width: usize) -> u32 {
    ((total + group_width - 1) / group_width) as u32
}

/// Where a network pass currently stands.
///
/// {Idle} —run_pass→ {Running, layer 0} —dispatch+barrier→
/// {Running, layer k+1} … —last layer complete→ {Idle}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    /// No pass in flight.
    #[default]
    Idle,
    /// Dispatching the given forwarding layer.
    Running {
        /// Index of the forwarding layer being computed.
        layer: usize,
    },
}

/// Issues the ordered per-layer dispatch sequence.
///
/// A pass either completes all layers or is abandoned wholesale: on a
/// device error the state returns to [`PassState::Idle`] and the error
/// propagates — there is no partial-layer resumption.
#[derive(Debug, Default)]
pub struct DispatchOrchestrator {
    state: PassState,
}

impl DispatchOrchestrator {
    /// Creates an idle orchestrator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current pass state.
    #[inline]
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Runs one full network pass: one dispatch per forwarding layer,
    /// in table order, with a barrier after each.
    ///
    /// The barrier after the *last* layer makes the finished pass's
    /// writes visible to host readback as well.
    pub fn run_pass<D: ComputeDevice>(
        &mut self,
        device: &mut D,
        layout: &NetworkLayout,
    ) -> FlatnetResult<()> {
        for (index, fwd) in layout.forwarding_layers().iter().enumerate() {
            self.state = PassState::Running { layer: index };
            log::trace!(
                "Dispatching layer {} ({} -> {} neurons)",
                index,
                fwd.src_size,
                fwd.dst_size
            );

            let groups = workgroup_count(fwd.dst_size, GROUP_WIDTH);
            let result = device
                .dispatch_layer(index, groups)
                .and_then(|_| device.barrier());
            if let Err(e) = result {
                // Abandoned wholesale: no partial-layer resumption.
                self.state = PassState::Idle;
                return Err(e);
            }
        }

        self.state = PassState::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceEvent, SoftwareDevice};
    use crate::layout::LayerSpec;

    #[test]
    fn test_workgroup_count_boundaries() {
        assert_eq!(workgroup_count(1, 32), 1);
        assert_eq!(workgroup_count(32, 32), 1);
        assert_eq!(workgroup_count(33, 32), 2);
        assert_eq!(workgroup_count(64, 32), 2);
        assert_eq!(workgroup_count(65, 32), 3);
    }

    #[test]
    fn test_pass_visits_layers_in_order_with_barriers() {
        let layout = NetworkLayout::plan(&LayerSpec::new(vec![4, 33, 32, 3]).unwrap());
        let mut device = SoftwareDevice::new();
        device.allocate(&layout).unwrap();

        let mut orchestrator = DispatchOrchestrator::new();
        orchestrator.run_pass(&mut device, &layout).unwrap();
        assert_eq!(orchestrator.state(), PassState::Idle);

        let events = device.take_events();
        assert_eq!(
            events,
            vec![
                DeviceEvent::Dispatch { layer: 0, groups: 2 }, // ceil(33/32)
                DeviceEvent::Barrier,
                DeviceEvent::Dispatch { layer: 1, groups: 1 }, // ceil(32/32)
                DeviceEvent::Barrier,
                DeviceEvent::Dispatch { layer: 2, groups: 1 }, // ceil(3/32)
                DeviceEvent::Barrier,
            ]
        );
    }

    #[test]
    fn test_error_abandons_pass() {
        let layout = NetworkLayout::plan(&LayerSpec::new(vec![4, 3]).unwrap());
        // Unallocated device: the first dispatch fails.
        let mut device = SoftwareDevice::new();
        let mut orchestrator = DispatchOrchestrator::new();
        assert!(orchestrator.run_pass(&mut device, &layout).is_err());
        assert_eq!(orchestrator.state(), PassState::Idle);
    }
}
