/// Cores kept online while suspended. Only the boot core is needed.
pub const SUSPEND_FLOOR: usize = 1;

/// Desired online-core count for the given device state.
#[inline]
pub fn compute_target(suspended: bool, max_online: usize) -> usize {
    if suspended { SUSPEND_FLOOR } else { max_online }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_always_floors() {
        for max in 1..=8 {
            assert_eq!(compute_target(true, max), SUSPEND_FLOOR);
            assert_eq!(compute_target(false, max), max);
        }
    }
}
