use rand::Rng;

/// Draw one item with probability proportional to its weight.
///
/// `r` is drawn uniformly from `[0, total)` and walked down the list; the first item whose
/// weight exceeds the remaining value wins. If the walk exhausts without a hit the last item
/// is returned, so a non-empty slice always yields a selection.
pub fn pick_weighted<'a, T, R>(
    items: &'a [T],
    weight: impl Fn(&T) -> u32,
    rng: &mut R,
) -> Option<&'a T>
where
    R: Rng + ?Sized,
{
    let last = items.last()?;
    let total: u64 = items.iter().map(|item| u64::from(weight(item))).sum();
    if total == 0 {
        return Some(last);
    }

    let mut remaining = rng.gen_range(0..total);
    for item in items {
        let w = u64::from(weight(item));
        if remaining < w {
            return Some(item);
        }
        remaining -= w;
    }

    Some(last)
}
