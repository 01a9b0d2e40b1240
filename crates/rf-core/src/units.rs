// rf-core/src/units.rs

use uom::si::f64::{
    Pressure as UomPressure, Time as UomTime, Volume as UomVolume, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;
pub type Time = UomTime;
pub type Volume = UomVolume;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

/// Time in seconds, the unit the stepping core works in.
#[inline]
pub fn as_seconds(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

#[inline]
pub fn as_days(t: Time) -> f64 {
    use uom::si::time::day;
    t.get::<day>()
}

/// Convenience for case files, which state durations in days.
#[inline]
pub fn days_to_seconds(v: f64) -> f64 {
    as_seconds(days(v))
}

#[inline]
pub fn seconds_to_days(v: f64) -> f64 {
    as_days(s(v))
}

#[inline]
pub fn m3_per_day(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_hour;
    VolumeRate::new::<cubic_meter_per_hour>(v / 24.0)
}

#[inline]
pub fn as_pascal(p: Pressure) -> f64 {
    use uom::si::pressure::pascal;
    p.get::<pascal>()
}

#[inline]
pub fn as_m3_per_s(q: VolumeRate) -> f64 {
    use uom::si::volume_rate::cubic_meter_per_second;
    q.get::<cubic_meter_per_second>()
}

#[inline]
pub fn bar_to_pa(v: f64) -> f64 {
    as_pascal(bar(v))
}

/// Field-style rates (m³/day) to SI (m³/s).
#[inline]
pub fn m3_per_day_to_m3_per_s(v: f64) -> f64 {
    as_m3_per_s(m3_per_day(v))
}

/// Per-bar coefficients (compressibility, m³/day/bar indices) to per-pascal.
#[inline]
pub fn per_bar_to_per_pa(v: f64) -> f64 {
    v / bar_to_pa(1.0)
}
