//! Device execution: mirror, launch, time, copy back.

use tracing::{debug, trace};

use crate::accelerator::{Accelerator, DeviceBuffer};
use crate::error::{DeviceError, DeviceResult};
use crate::host::HostBuffers;
use crate::launch::LaunchConfig;

/// What one device execution produced besides the output buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceRun {
    /// Launch shape used.
    pub launch: LaunchConfig,
    /// Milliseconds between the start and end events around the launch.
    pub kernel_ms: f32,
}

/// Runs `C = A + B` for a set of host buffers on one accelerator.
pub struct DeviceExecutor<'a, A: Accelerator> {
    accelerator: &'a A,
}

impl<'a, A: Accelerator> DeviceExecutor<'a, A> {
    /// Create an executor over `accelerator`.
    pub fn new(accelerator: &'a A) -> Self {
        Self { accelerator }
    }

    /// Offload the addition and write the result into `host.c`.
    ///
    /// Only the kernel launch is timed. `C` is never copied to the device.
    /// Device buffers and events are released before this returns, on
    /// success and on error.
    pub fn execute(
        &self,
        host: &mut HostBuffers,
        launch: &LaunchConfig,
    ) -> DeviceResult<DeviceRun> {
        let n = host.len();
        if launch.element_count != n {
            return Err(DeviceError::OutOfBounds {
                required: launch.element_count,
                available: n,
            });
        }
        let acc = self.accelerator;

        let kernel_ms = {
            let mut d_a = acc.alloc(n)?;
            let mut d_b = acc.alloc(n)?;
            let mut d_c = acc.alloc(n)?;
            debug!(
                device = acc.name(),
                bytes = d_a.byte_size(),
                "allocated device mirrors"
            );

            acc.copy_to_device(host.a(), &mut d_a)?;
            acc.copy_to_device(host.b(), &mut d_b)?;

            let mut start = acc.create_event()?;
            let mut end = acc.create_event()?;

            debug!(
                blocks = launch.blocks_per_grid,
                threads = launch.threads_per_block,
                "launching vector_add"
            );
            acc.record_event(&mut start)?;
            acc.launch_vector_add(launch, &d_a, &d_b, &mut d_c)?;
            acc.record_event(&mut end)?;
            acc.synchronize_event(&end)?;
            let kernel_ms = acc.elapsed_ms(&start, &end)?;

            acc.copy_to_host(&d_c, host.c_mut())?;
            trace!("releasing device mirrors and events");
            kernel_ms
        };

        debug!(kernel_ms, "device execution complete");
        Ok(DeviceRun {
            launch: *launch,
            kernel_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::host::InputSource;

    struct MockBuffer(Vec<f64>);

    impl DeviceBuffer for MockBuffer {
        fn len(&self) -> usize {
            self.0.len()
        }
    }

    /// Accelerator that runs on the host and logs every call.
    #[derive(Default)]
    struct RecordingAccelerator {
        calls: RefCell<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingAccelerator {
        fn log(&self, call: &'static str) -> DeviceResult<()> {
            self.calls.borrow_mut().push(call);
            if self.fail_on == Some(call) {
                return Err(DeviceError::api(call, "injected"));
            }
            Ok(())
        }
    }

    impl Accelerator for RecordingAccelerator {
        type Buffer = MockBuffer;
        type Event = Option<u32>;

        fn name(&self) -> &str {
            "recording"
        }

        fn alloc(&self, len: usize) -> DeviceResult<MockBuffer> {
            self.log("alloc")?;
            Ok(MockBuffer(vec![f64::NAN; len]))
        }

        fn copy_to_device(&self, src: &[f64], dst: &mut MockBuffer) -> DeviceResult<()> {
            self.log("htod")?;
            dst.0[..src.len()].copy_from_slice(src);
            Ok(())
        }

        fn copy_to_host(&self, src: &MockBuffer, dst: &mut [f64]) -> DeviceResult<()> {
            self.log("dtoh")?;
            let n = dst.len();
            dst.copy_from_slice(&src.0[..n]);
            Ok(())
        }

        fn create_event(&self) -> DeviceResult<Option<u32>> {
            self.log("event_create")?;
            Ok(None)
        }

        fn record_event(&self, event: &mut Option<u32>) -> DeviceResult<()> {
            self.log("event_record")?;
            *event = Some(self.calls.borrow().len() as u32);
            Ok(())
        }

        fn synchronize_event(&self, event: &Option<u32>) -> DeviceResult<()> {
            self.log("event_sync")?;
            assert!(event.is_some());
            Ok(())
        }

        fn elapsed_ms(&self, start: &Option<u32>, end: &Option<u32>) -> DeviceResult<f32> {
            self.log("elapsed")?;
            Ok((end.unwrap() - start.unwrap()) as f32)
        }

        fn launch_vector_add(
            &self,
            config: &LaunchConfig,
            a: &MockBuffer,
            b: &MockBuffer,
            c: &mut MockBuffer,
        ) -> DeviceResult<()> {
            self.log("launch")?;
            for id in 0..config.element_count {
                c.0[id] = a.0[id] + b.0[id];
            }
            Ok(())
        }
    }

    #[test]
    fn test_call_sequence() {
        let acc = RecordingAccelerator::default();
        let mut host = HostBuffers::generate(1000, InputSource::Seeded(5)).unwrap();
        let launch = LaunchConfig::for_elements(1000, 256).unwrap();

        let run = DeviceExecutor::new(&acc).execute(&mut host, &launch).unwrap();

        assert_eq!(run.launch, launch);
        assert_eq!(
            *acc.calls.borrow(),
            vec![
                "alloc",
                "alloc",
                "alloc",
                "htod",
                "htod",
                "event_create",
                "event_create",
                "event_record",
                "launch",
                "event_record",
                "event_sync",
                "elapsed",
                "dtoh",
            ]
        );
        // Only the launch sits between the two records.
        assert_eq!(run.kernel_ms, 2.0);
    }

    #[test]
    fn test_output_is_elementwise_sum() {
        let acc = RecordingAccelerator::default();
        let mut host = HostBuffers::generate(777, InputSource::Seeded(9)).unwrap();
        let launch = LaunchConfig::for_elements(777, 256).unwrap();

        DeviceExecutor::new(&acc).execute(&mut host, &launch).unwrap();

        for i in 0..host.len() {
            assert_eq!(host.c()[i], host.a()[i] + host.b()[i]);
        }
    }

    #[test]
    fn test_device_error_propagates() {
        let acc = RecordingAccelerator {
            fail_on: Some("launch"),
            ..Default::default()
        };
        let mut host = HostBuffers::generate(16, InputSource::Constant(0.0)).unwrap();
        let launch = LaunchConfig::for_elements(16, 256).unwrap();

        let err = DeviceExecutor::new(&acc)
            .execute(&mut host, &launch)
            .unwrap_err();

        assert_eq!(err.call_site(), Some("launch"));
        assert!(!acc.calls.borrow().contains(&"dtoh"));
        assert!(host.c().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rejects_mismatched_launch() {
        let acc = RecordingAccelerator::default();
        let mut host = HostBuffers::generate(16, InputSource::Constant(0.0)).unwrap();
        let launch = LaunchConfig::for_elements(32, 256).unwrap();

        let err = DeviceExecutor::new(&acc)
            .execute(&mut host, &launch)
            .unwrap_err();

        assert!(matches!(err, DeviceError::OutOfBounds { .. }));
        assert!(acc.calls.borrow().is_empty());
    }
}
