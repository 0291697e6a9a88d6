use crate::{
    error::{ResizeError, Result},
    resize::key::Dimension,
};

/// Reject a zero axis or one above `max` before any I/O happens
///
/// # Errors
///
/// Will return `UnsupportedDimensions` on a zero or too large axis
pub fn check_requested(width: Dimension, height: Dimension, max: u32) -> Result<()> {
    for (axis, dimension) in [("width", width), ("height", height)] {
        match dimension {
            Dimension::Fixed(0) => {
                return Err(ResizeError::UnsupportedDimensions(format!(
                    "{axis} must be greater than 0"
                )));
            }
            Dimension::Fixed(n) if n > max => {
                return Err(ResizeError::UnsupportedDimensions(format!(
                    "{axis} {n} exceeds the maximum of {max}"
                )));
            }
            _ => (),
        }
    }
    Ok(())
}

/// Resolve the target box from the requested axes and the source size.
///
/// A single auto axis keeps the source aspect ratio, both auto keeps the
/// source size.
#[must_use]
pub fn resolve(width: Dimension, height: Dimension, source: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    match (width, height) {
        (Dimension::Fixed(w), Dimension::Fixed(h)) => (w, h),
        (Dimension::Fixed(w), Dimension::Auto) => (w, scale(w, src_h, src_w)),
        (Dimension::Auto, Dimension::Fixed(h)) => (scale(h, src_w, src_h), h),
        (Dimension::Auto, Dimension::Auto) => (src_w, src_h),
    }
}

/// `round(value * num / den)`, at least 1
fn scale(value: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return value.max(1);
    }
    let scaled = (u64::from(value) * u64::from(num) + u64::from(den) / 2) / u64::from(den);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Bound a resolved box, the auto axis can grow past the limit on very thin sources
///
/// # Errors
///
/// Will return `UnsupportedDimensions` when an axis is above `max`
pub fn check_resolved(target: (u32, u32), max: u32) -> Result<()> {
    if target.0 > max || target.1 > max {
        return Err(ResizeError::UnsupportedDimensions(format!(
            "resolved size {}x{} exceeds the maximum of {max}",
            target.0, target.1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Dimension::{Auto, Fixed};

    #[test]
    fn test_resolve_fixed() {
        assert_eq!(resolve(Fixed(200), Fixed(200), (1000, 500)), (200, 200));
    }

    #[test]
    fn test_resolve_width_auto_height() {
        assert_eq!(resolve(Fixed(400), Auto, (1000, 500)), (400, 200));
        // 100 * 333 / 1000 = 33.3
        assert_eq!(resolve(Fixed(100), Auto, (1000, 333)), (100, 33));
        // 100 * 335 / 1000 = 33.5
        assert_eq!(resolve(Fixed(100), Auto, (1000, 335)), (100, 34));
    }

    #[test]
    fn test_resolve_auto_width() {
        assert_eq!(resolve(Auto, Fixed(250), (1000, 500)), (500, 250));
    }

    #[test]
    fn test_resolve_minimum_one() {
        assert_eq!(resolve(Fixed(10), Auto, (10_000, 1)), (10, 1));
        assert_eq!(resolve(Auto, Fixed(1), (1, 10_000)), (1, 1));
    }

    #[test]
    fn test_resolve_both_auto() {
        assert_eq!(resolve(Auto, Auto, (640, 480)), (640, 480));
    }

    #[test]
    fn test_check_requested() {
        assert!(check_requested(Fixed(200), Auto, 4096).is_ok());
        assert!(check_requested(Auto, Auto, 4096).is_ok());
        assert!(matches!(
            check_requested(Fixed(0), Fixed(10), 4096),
            Err(ResizeError::UnsupportedDimensions(_))
        ));
        assert!(matches!(
            check_requested(Auto, Fixed(5000), 4096),
            Err(ResizeError::UnsupportedDimensions(_))
        ));
    }

    #[test]
    fn test_check_resolved() {
        assert!(check_resolved((4096, 1), 4096).is_ok());
        assert!(check_resolved((4097, 1), 4096).is_err());
    }
}
