/// Simple linear resampling
pub fn resample_linear(samples: &[i16], sr_in: u32, sr_out: u32) -> Vec<i16> {
    if sr_in == sr_out || samples.is_empty() || sr_in == 0 {
        return samples.to_vec();
    }

    let ratio = f64::from(sr_out) / f64::from(sr_in);
    let out_len = (samples.len() as f64 * ratio) as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 / ratio;
            let i0 = (pos.floor() as usize).min(last);
            let i1 = (i0 + 1).min(last);
            let t = pos - i0 as f64;
            let s = f64::from(samples[i0]) * (1.0 - t) + f64::from(samples[i1]) * t;
            s.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
        })
        .collect()
}
