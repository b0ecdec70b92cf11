/// Configuration options for a binding session.
///
/// # Examples
///
/// ```rust
/// use braceconf::BinderOptions;
///
/// let options = BinderOptions {
///     ignore_case: true,
///     ..Default::default()
/// };
/// assert_eq!(options.max_depth, 128);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BinderOptions {
    /// Whether key names are matched ASCII case-insensitively.
    ///
    /// Matching is still first-match in schema declaration order.
    ///
    /// # Default
    ///
    /// `false`
    pub ignore_case: bool,

    /// Maximum depth of the context stack, counting the root frame as 1.
    ///
    /// Object nesting is controlled by the input, so it is bounded
    /// explicitly. Skipped sub-trees and sub-trees inside a deferred capture
    /// count towards the limit as well. Exceeding it fails the session with
    /// [`SchemaError::DepthLimitExceeded`](crate::SchemaError::DepthLimitExceeded).
    ///
    /// # Default
    ///
    /// `128`
    pub max_depth: usize,
}

impl Default for BinderOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            max_depth: 128,
        }
    }
}
