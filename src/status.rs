/// Connection flags shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KernelStatus {
    /// A kernel session became ready at least once.
    pub connected_once: bool,
    /// The comm target was registered with the current kernel.
    pub connected_now: bool,
    /// The kernel counterpart answered with history or a message.
    pub has_kernel: bool,
}

impl KernelStatus {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
