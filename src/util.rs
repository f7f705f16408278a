use std::ops::Range;


/// Perform a binary search on a slice sorted by `f`, returning the
/// index of the last item whose key is less than or equal to `item`,
/// if any.
///
/// This functionality is useful for cases where elements carry only a
/// start address and an address to search for is covered by the
/// closest preceding element.
pub(crate) fn find_lower_bound_by_key<T, U, F>(slice: &[T], item: U, mut f: F) -> Option<usize>
where
    U: Ord,
    F: FnMut(&T) -> U,
{
    // `idx` references the first item strictly greater than the one we
    // are looking for, so the one before it (if any) is our match.
    let idx = slice.partition_point(|e| f(e) <= item);
    idx.checked_sub(1)
}

/// Find the range of indices of all items in a slice sorted by `f`
/// whose key equals `item`.
///
/// The returned range is empty if no such item exists.
pub(crate) fn find_equal_range_by_key<T, U, F>(slice: &[T], item: U, mut f: F) -> Range<usize>
where
    U: Ord,
    F: FnMut(&T) -> U,
{
    let start = slice.partition_point(|e| f(e) < item);
    let len = slice[start..].partition_point(|e| f(e) == item);
    start..start + len
}
