//! Display-name allocation for sessions.
//!
//! Names are `<kernel id fragment>/<letter>` with letters assigned in
//! order: `3764/A`, `3764/B`, … When a candidate collides with a
//! registered session, the colliding session's kernel id is reported back:
//! generating the same name is taken as a hint that the caller means to
//! attach to that same kernel. Matching on the generated name rather than
//! on the requested connection file can misattribute the kernel when two
//! unrelated kernels share a fragment prefix; see DESIGN.md before
//! changing this.

use kernel_link::KernelId;

/// Outcome of a name allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedName {
    /// Guaranteed absent from the `existing` table passed to [`allocate`].
    pub display_name: String,
    /// Kernel bound to the last session whose name collided during the
    /// scan, if any.
    pub matched_kernel: Option<KernelId>,
}

/// Allocate a unique display name for `fragment`.
///
/// `existing` holds the display name and bound kernel of every currently
/// registered session that should count as taken.
pub fn allocate(fragment: &str, existing: &[(String, KernelId)]) -> AllocatedName {
    let mut matched = None;
    let mut offset = 0u32;
    loop {
        // With n taken names, one of the first n + 1 candidates is free.
        let letter = char::from_u32('A' as u32 + offset).expect("more candidates than sessions");
        let candidate = format!("{fragment}/{letter}");
        let Some((_, kernel)) = existing.iter().find(|(name, _)| *name == candidate) else {
            return AllocatedName {
                display_name: candidate,
                matched_kernel: matched,
            };
        };
        matched = Some(*kernel);
        offset += 1;
    }
}
