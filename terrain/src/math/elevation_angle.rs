use num_traits::{Float, FloatConst};

/// Returns the cosine of the angle at an observer `observer_r` from
/// the earth's center, between the center and a target `target_r`
/// from the center and `distance` away.
///
/// Comparing these cosines is how obstructions are found without
/// paying for `acos`: a _larger_ cosine means a _lower_ elevation
/// angle.
pub fn cos_angle<T>(observer_r: T, distance: T, target_r: T) -> T
where
    T: Float,
{
    let two = T::one() + T::one();
    (observer_r.powi(2) + distance.powi(2) - target_r.powi(2)) / (two * observer_r * distance)
}

/// Returns the up/down angle (in radians) from an observer at
/// `observer_elev` to a target at `target_elev`, `distance` away.
///
/// All lengths share a unit with `earth_radius`.
pub fn elevation_angle<T>(observer_elev: T, distance: T, target_elev: T, earth_radius: T) -> T
where
    T: Float + FloatConst,
{
    let cos = cos_angle(
        observer_elev + earth_radius,
        distance,
        target_elev + earth_radius,
    );
    cos.max(-T::one()).min(T::one()).acos() - T::FRAC_PI_2()
}
