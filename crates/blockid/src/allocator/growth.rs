/// Computes how far a ceiling must grow to cover `need_count`.
///
/// The result is the smallest multiple of the block granularity
/// (`block_size * step`) that is at least `need_count`:
///
/// ```text
/// ceil(need_count / (block_size * step)) * block_size * step
/// ```
///
/// A request for a single id still reserves a full block, so the following
/// requests are served from memory; bulk requests round up to a block
/// boundary instead of issuing several small transactions.
///
/// Returns `None` if `step` or `block_size` is not positive, if `need_count`
/// is negative, or on overflow.
///
/// # Example
/// ```
/// use blockid::calculate_id_increase;
///
/// assert_eq!(calculate_id_increase(1, 1, 50), Some(50));
/// assert_eq!(calculate_id_increase(51, 1, 50), Some(100));
/// assert_eq!(calculate_id_increase(6, 2, 5), Some(10));
/// ```
pub const fn calculate_id_increase(need_count: i64, step: i32, block_size: i64) -> Option<i64> {
    if step <= 0 || block_size <= 0 || need_count < 0 {
        return None;
    }
    let Some(granularity) = block_size.checked_mul(step as i64) else {
        return None;
    };
    let blocks = need_count / granularity + (need_count % granularity != 0) as i64;
    blocks.checked_mul(granularity)
}
