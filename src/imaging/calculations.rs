//! Pure calculation functions for scale/crop planning.
//!
//! All functions here are pure and testable without any I/O or images.
//! Dimensions are `(width, height)` tuples; the target box may have a zero
//! side, which ImageMagick reads as "unconstrained".

/// Per-axis ratio between the target box and the source image.
fn axis_ratios(source: (u32, u32), target: (u32, u32)) -> (f64, f64) {
    (
        target.0 as f64 / source.0 as f64,
        target.1 as f64 / source.1 as f64,
    )
}

/// Pick the scale argument that makes the source cover the target box.
///
/// The axis with the larger ratio is pinned to the target; the other axis
/// ends up at least as large as the box. Ties pin the width.
///
/// # Returns
/// * `(scale_arg, factor)` - ImageMagick `-scale` argument (`"Wx"` or `"xH"`)
///   and the factor the source will be multiplied by
///
/// # Examples
/// ```
/// # use thumbnailer::imaging::calculations::scale_for_cover;
/// // Landscape into a square box: pin the height
/// let (arg, _) = scale_for_cover((800, 600), (100, 100));
/// assert_eq!(arg, "x100");
/// ```
pub fn scale_for_cover(source: (u32, u32), target: (u32, u32)) -> (String, f64) {
    let (ratio_w, ratio_h) = axis_ratios(source, target);

    // "Horizontal or square" ratio: width ratio dominates
    if ratio_h <= ratio_w {
        (format!("{}x", target.0), ratio_w)
    } else {
        (format!("x{}", target.1), ratio_h)
    }
}

/// Centered crop rectangle for an image scaled by `factor`.
///
/// Offsets are truncated toward zero, matching ImageMagick's integer
/// geometry offsets.
///
/// # Returns
/// * `"WxH+X+Y"` crop geometry in target dimensions
pub fn crop_rectangle(source: (u32, u32), target: (u32, u32), factor: f64) -> String {
    let (ratio_w, ratio_h) = axis_ratios(source, target);
    let (tgt_w, tgt_h) = target;

    let (x, y) = if ratio_h <= ratio_w {
        let overflow = source.1 as f64 * factor - tgt_h as f64;
        (0, (overflow / 2.0) as i64)
    } else {
        let overflow = source.0 as f64 * factor - tgt_w as f64;
        ((overflow / 2.0) as i64, 0)
    };

    format!("{}x{}+{}+{}", tgt_w, tgt_h, x, y)
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
/// This is the size of the intermediate image between `-scale` and `-crop`.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (ratio_w, ratio_h) = axis_ratios(source, target);
    let (src_w, src_h) = source;

    if ratio_h <= ratio_w {
        // Width matches, height may exceed
        let h = (src_h as f64 * ratio_w).round() as u32;
        (target.0, h)
    } else {
        // Height matches, width may exceed
        let w = (src_w as f64 * ratio_h).round() as u32;
        (w, target.1)
    }
}
