//! CUDA C source for the elementwise kernel.

/// Module name the kernel is loaded under.
pub const MODULE_NAME: &str = "vecadd";

/// Entry point name.
pub const VECTOR_ADD: &str = "vector_add";

/// `c[id] = a[id] + b[id]` for `id < n`; one work-item per element.
///
/// The grid is rounded up to whole blocks, so the guard is what keeps the
/// last block inside the buffers.
pub const VECTOR_ADD_CUDA: &str = r#"
extern "C" __global__ void vector_add(
    const double* __restrict__ a,
    const double* __restrict__ b,
    double* __restrict__ c,
    unsigned long long n
) {
    unsigned long long id = (unsigned long long)blockDim.x * blockIdx.x + threadIdx.x;
    if (id < n) {
        c[id] = a[id] + b[id];
    }
}
"#;
