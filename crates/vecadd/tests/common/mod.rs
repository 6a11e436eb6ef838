//! Helpers shared by the integration tests.

use vecadd::prelude::*;
use vecadd_cpu::{CpuBuffer, CpuEvent};

/// CPU accelerator whose device-to-host copy shifts the first result by 1000.
pub struct CorruptingAccelerator(pub CpuAccelerator);

impl Accelerator for CorruptingAccelerator {
    type Buffer = CpuBuffer;
    type Event = CpuEvent;

    fn name(&self) -> &str {
        "corrupting cpu"
    }

    fn alloc(&self, len: usize) -> DeviceResult<CpuBuffer> {
        self.0.alloc(len)
    }

    fn copy_to_device(&self, src: &[f64], dst: &mut CpuBuffer) -> DeviceResult<()> {
        self.0.copy_to_device(src, dst)
    }

    fn copy_to_host(&self, src: &CpuBuffer, dst: &mut [f64]) -> DeviceResult<()> {
        self.0.copy_to_host(src, dst)?;
        if let Some(first) = dst.first_mut() {
            *first += 1000.0;
        }
        Ok(())
    }

    fn create_event(&self) -> DeviceResult<CpuEvent> {
        self.0.create_event()
    }

    fn record_event(&self, event: &mut CpuEvent) -> DeviceResult<()> {
        self.0.record_event(event)
    }

    fn synchronize_event(&self, event: &CpuEvent) -> DeviceResult<()> {
        self.0.synchronize_event(event)
    }

    fn elapsed_ms(&self, start: &CpuEvent, end: &CpuEvent) -> DeviceResult<f32> {
        self.0.elapsed_ms(start, end)
    }

    fn launch_vector_add(
        &self,
        config: &LaunchConfig,
        a: &CpuBuffer,
        b: &CpuBuffer,
        c: &mut CpuBuffer,
    ) -> DeviceResult<()> {
        self.0.launch_vector_add(config, a, b, c)
    }
}
