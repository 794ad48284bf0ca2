use webproxy_config::CacheLimits;

/// Objects above the per-object ceiling are never admitted.
pub(crate) fn admits(limits: &CacheLimits, size: usize) -> bool {
    size <= limits.max_object_size()
}

/// Whether `incoming` more bytes fit next to `current` without eviction.
pub(crate) fn fits(limits: &CacheLimits, current: usize, incoming: usize) -> bool {
    current.saturating_add(incoming) <= limits.max_cache_size()
}
