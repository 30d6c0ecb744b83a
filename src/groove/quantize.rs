// Tick Quantization - Snaps chart ticks to a note-value grid
// quant_div is the note value: 4 = quarter notes, 16 = sixteenths, 32 = 32nds

/// Grid unit in ticks for a note value: `resolution * 4 / quant_div`
///
/// `resolution` is ticks per quarter note, so a whole note is `4 * resolution`.
pub fn quantize_unit(resolution: u32, quant_div: u32) -> f64 {
    resolution as f64 * 4.0 / quant_div.max(1) as f64
}

/// Snap a tick to the nearest grid line
///
/// `round(tick / unit) * unit`, rounded to a whole tick. Applying it twice
/// gives the same result as applying it once.
pub fn quantize_tick(tick: u32, resolution: u32, quant_div: u32) -> u32 {
    let unit = quantize_unit(resolution, quant_div);
    if unit <= 0.0 {
        return tick;
    }
    ((tick as f64 / unit).round() * unit).round() as u32
}

/// Distance in ticks from `tick` to its nearest grid line
pub fn snap_delta(tick: u32, resolution: u32, quant_div: u32) -> i64 {
    quantize_tick(tick, resolution, quant_div) as i64 - tick as i64
}
