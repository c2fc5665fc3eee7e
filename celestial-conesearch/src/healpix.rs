//! HEALPix nested-scheme pixelization, disc queries and angular separation.
//!
//! Pixel numbers follow the reference HEALPix library (`ang2pix` with
//! `nest=True`) bit for bit: catalogs written by another tool that uses the
//! same numbering can be served by this crate and vice versa. The algorithm
//! is the Gorski et al. (2005) face/x/y decomposition with the Z-order bit
//! interleave inside each of the 12 base faces.
//!
//! Angles come in as decimal degrees. Internally positions are handled as
//! colatitude `theta` and longitude `phi` in radians, matching the reference
//! convention `theta = (90 - dec)·π/180`, `phi = ra·π/180`.

use std::f64::consts::{FRAC_2_PI, FRAC_PI_2, PI};

/// Deepest order representable in a `u64` nested index.
pub const MAX_ORDER: u32 = 29;

const TWO_THIRDS: f64 = 2.0 / 3.0;

/// Reference implementation switches to the `sin(theta)` formulation this
/// close to either pole.
const POLAR_THETA: f64 = 0.01;
const POLAR_THETA_SOUTH: f64 = 3.14159 - 0.01;

/// Headroom applied to [`max_pixrad`] during disc resolution.
const PIXRAD_PADDING: f64 = 1.1;

const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// True if `nside` is a power of two no deeper than [`MAX_ORDER`].
pub fn is_valid_nside(nside: u32) -> bool {
    nside.is_power_of_two() && nside.trailing_zeros() <= MAX_ORDER
}

/// Total number of pixels at resolution `nside`: `12 * nside^2`.
pub fn npix(nside: u32) -> u64 {
    12 * nside as u64 * nside as u64
}

/// Convert (RA, Dec) in degrees to colatitude/longitude in radians.
pub fn radec_to_thetaphi(ra_deg: f64, dec_deg: f64) -> (f64, f64) {
    ((90.0 - dec_deg) * PI / 180.0, ra_deg * PI / 180.0)
}

/// Convert (RA, Dec) in degrees to the nested pixel index at `nside`.
///
/// `nside` must satisfy [`is_valid_nside`]. RA outside `[0, 360)` wraps.
///
/// # Arguments
/// * `nside` - HEALPix nside parameter
/// * `ra_deg` - Right ascension in degrees
/// * `dec_deg` - Declination in degrees, within `[-90, 90]`
///
/// # Returns
/// Nested pixel index in range [0, 12*nside^2)
pub fn pixelize(nside: u32, ra_deg: f64, dec_deg: f64) -> u64 {
    let (theta, phi) = radec_to_thetaphi(ra_deg, dec_deg);
    ang2pix_nest(nside as u64, theta, phi)
}

/// Nested pixel index of the point at colatitude `theta`, longitude `phi`.
pub fn ang2pix_nest(nside: u64, theta: f64, phi: f64) -> u64 {
    let z = libm::cos(theta);
    if theta < POLAR_THETA || theta > POLAR_THETA_SOUTH {
        loc2pix_nest(nside, z, phi, Some(libm::sin(theta)))
    } else {
        loc2pix_nest(nside, z, phi, None)
    }
}

fn loc2pix_nest(nside: u64, z: f64, phi: f64, sth: Option<f64>) -> u64 {
    let ns = nside as i64;
    let za = libm::fabs(z);
    let tt = fmodulo(phi * FRAC_2_PI, 4.0);

    if za <= TWO_THIRDS {
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * (z * 0.75);
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp / ns;
        let ifm = jm / ns;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        let ix = jm & (ns - 1);
        let iy = ns - (jp & (ns - 1)) - 1;
        xyf2nest(nside, ix as u64, iy as u64, face as u64)
    } else {
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = match sth {
            Some(sth) if za >= 0.99 => nside as f64 * sth / libm::sqrt((1.0 + za) / 3.0),
            _ => nside as f64 * libm::sqrt(3.0 * (1.0 - za)),
        };
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);
        if z > 0.0 {
            xyf2nest(nside, (ns - jm - 1) as u64, (ns - jp - 1) as u64, ntt as u64)
        } else {
            xyf2nest(nside, jp as u64, jm as u64, (ntt + 8) as u64)
        }
    }
}

/// Centre of a nested pixel as (colatitude, longitude) in radians.
pub fn pix2ang_nest(nside: u64, pix: u64) -> (f64, f64) {
    let ns = nside as i64;
    let order = nside.trailing_zeros();
    let fact2 = 4.0 / (12 * nside * nside) as f64;
    let fact1 = (2 * nside) as f64 * fact2;

    let (ix, iy, face) = nest2xyf(nside, pix);
    let (ix, iy, face) = (ix as i64, iy as i64, face as usize);
    let jr = (JRLL[face] << order) - ix - iy - 1;

    let (nr, z, sth) = if jr < ns {
        let tmp = (jr * jr) as f64 * fact2;
        let z = 1.0 - tmp;
        (jr, z, libm::sqrt(tmp * (2.0 - tmp)))
    } else if jr > 3 * ns {
        let nr = 4 * ns - jr;
        let tmp = (nr * nr) as f64 * fact2;
        let z = tmp - 1.0;
        (nr, z, libm::sqrt(tmp * (2.0 - tmp)))
    } else {
        let z = (2 * ns - jr) as f64 * fact1;
        (ns, z, libm::sqrt((1.0 - z) * (1.0 + z)))
    };

    let mut tmp = JPLL[face] * nr + ix - iy;
    if tmp < 0 {
        tmp += 8 * nr;
    }
    let phi = if nr == ns {
        0.75 * FRAC_PI_2 * tmp as f64 * fact1
    } else {
        (0.5 * FRAC_PI_2 * tmp as f64) / nr as f64
    };

    (libm::atan2(sth, z), phi)
}

/// Upper bound on the angular distance (radians) between the centre of any
/// pixel at `nside` and any of its corners.
pub fn max_pixrad(nside: u64) -> f64 {
    let va = unit_vector(TWO_THIRDS, PI / (4 * nside) as f64);
    let t1 = 1.0 - 1.0 / nside as f64;
    let vb = unit_vector(1.0 - t1 * t1 / 3.0, 0.0);
    vector_angle(va, vb)
}

/// All nested pixels at `nside` that intersect the disc of `radius_deg`
/// around (`ra_deg`, `dec_deg`), sorted ascending.
///
/// Inclusive: any pixel touching the disc is returned, along with some
/// pixels near the boundary that don't. Walks the nested tree from the 12
/// base pixels and only descends into cells whose centre lies within
/// `radius + max_pixrad(depth)` of the disc centre.
///
/// # Arguments
/// * `nside` - HEALPix nside parameter
/// * `ra_deg` - Disc centre right ascension in degrees
/// * `dec_deg` - Disc centre declination in degrees
/// * `radius_deg` - Disc radius in degrees; 180 or more covers the sphere
///
/// # Returns
/// Vector of nested pixel indices that may overlap the disc
pub fn query_disc_nest(nside: u32, ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Vec<u64> {
    let order = nside.trailing_zeros();
    let radius = radius_deg.to_radians();
    if radius >= PI {
        return (0..npix(nside)).collect();
    }

    let center_theta = (90.0 - dec_deg).to_radians();
    let center_phi = ra_deg.to_radians();

    let reach: Vec<f64> = (0..=order)
        .map(|depth| radius + max_pixrad(1u64 << depth) * PIXRAD_PADDING)
        .collect();

    let mut pixels = Vec::new();
    let mut stack: Vec<(u32, u64)> = (0..12).rev().map(|face| (0, face)).collect();

    while let Some((depth, pix)) = stack.pop() {
        let (theta, phi) = pix2ang_nest(1u64 << depth, pix);
        let dist = haversine_rad(center_phi, FRAC_PI_2 - center_theta, phi, FRAC_PI_2 - theta);
        if dist > reach[depth as usize] {
            continue;
        }
        if depth == order {
            pixels.push(pix);
        } else {
            for child in (0..4).rev() {
                stack.push((depth + 1, pix * 4 + child));
            }
        }
    }

    pixels.sort_unstable();
    pixels
}

/// Great-circle distance between two positions, in degrees, by the
/// haversine formula.
///
/// # Arguments
/// * `ra1_deg`, `dec1_deg` - First point in degrees
/// * `ra2_deg`, `dec2_deg` - Second point in degrees
///
/// # Returns
/// Angular distance in degrees, in `[0, 180]`
pub fn angular_separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    haversine_rad(
        ra1_deg.to_radians(),
        dec1_deg.to_radians(),
        ra2_deg.to_radians(),
        dec2_deg.to_radians(),
    )
    .to_degrees()
}

fn haversine_rad(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let sin_dlat = libm::sin((lat1 - lat2) / 2.0);
    let sin_dlon = libm::sin((lon1 - lon2) / 2.0);
    let h = sin_dlat * sin_dlat + sin_dlon * sin_dlon * libm::cos(lat1) * libm::cos(lat2);
    2.0 * libm::asin(libm::sqrt(h.min(1.0)))
}

fn fmodulo(v1: f64, v2: f64) -> f64 {
    if v1 >= 0.0 {
        return if v1 < v2 { v1 } else { libm::fmod(v1, v2) };
    }
    let tmp = libm::fmod(v1, v2) + v2;
    if tmp == v2 {
        0.0
    } else {
        tmp
    }
}

fn xyf2nest(nside: u64, ix: u64, iy: u64, face: u64) -> u64 {
    face * nside * nside + spread_bits(ix) + (spread_bits(iy) << 1)
}

fn nest2xyf(nside: u64, pix: u64) -> (u64, u64, u64) {
    let npface = nside * nside;
    let face = pix / npface;
    let ipf = pix % npface;
    (compress_bits(ipf), compress_bits(ipf >> 1), face)
}

/// Move bit `i` of `v` to bit `2i`.
fn spread_bits(v: u64) -> u64 {
    let mut result = 0u64;
    for i in 0..32 {
        result |= ((v >> i) & 1) << (2 * i);
    }
    result
}

/// Inverse of [`spread_bits`]: collect the even bits of `v`.
fn compress_bits(v: u64) -> u64 {
    let mut result = 0u64;
    for i in 0..32 {
        result |= ((v >> (2 * i)) & 1) << i;
    }
    result
}

fn unit_vector(z: f64, phi: f64) -> [f64; 3] {
    let sth = libm::sqrt((1.0 - z) * (1.0 + z));
    [sth * libm::cos(phi), sth * libm::sin(phi), z]
}

fn vector_angle(a: [f64; 3], b: [f64; 3]) -> f64 {
    let cross = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    let cross_len = libm::sqrt(cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]);
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    libm::atan2(cross_len, dot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_bits() {
        assert_eq!(xyf2nest(4, 0, 0, 0), 0);
        assert_eq!(xyf2nest(4, 1, 0, 0), 1);
        assert_eq!(xyf2nest(4, 0, 1, 0), 2);
        assert_eq!(xyf2nest(4, 1, 1, 0), 3);
        assert_eq!(xyf2nest(4, 3, 3, 1), 16 + 15);
        for v in [0u64, 1, 5, 1023, (1 << 29) - 1] {
            assert_eq!(compress_bits(spread_bits(v)), v);
        }
    }

    #[test]
    fn test_valid_nside() {
        assert!(is_valid_nside(1));
        assert!(is_valid_nside(32));
        assert!(is_valid_nside(1 << 29));
        assert!(!is_valid_nside(0));
        assert!(!is_valid_nside(48));
        assert!(!is_valid_nside(1 << 30));
    }

    #[test]
    fn test_base_faces() {
        // Face interiors at nside 1: pixel index == face number.
        assert_eq!(pixelize(1, 45.0, 60.0), 0);
        assert_eq!(pixelize(1, 135.0, 60.0), 1);
        assert_eq!(pixelize(1, 315.0, 60.0), 3);
        assert_eq!(pixelize(1, 0.0, 0.0), 4);
        assert_eq!(pixelize(1, 90.0, 0.0), 5);
        assert_eq!(pixelize(1, 180.0, 0.0), 6);
        assert_eq!(pixelize(1, 270.0, 0.0), 7);
        assert_eq!(pixelize(1, 45.0, -60.0), 8);
        assert_eq!(pixelize(1, 315.0, -60.0), 11);
    }

    #[test]
    fn test_poles() {
        let north = pixelize(32, 0.0, 90.0);
        assert!(north < npix(32) / 3);
        let south = pixelize(32, 0.0, -90.0);
        assert!(south >= 8 * 32 * 32 && south < npix(32));
    }

    #[test]
    fn test_ra_wraps() {
        assert_eq!(pixelize(64, 360.0, 12.5), pixelize(64, 0.0, 12.5));
        assert_eq!(pixelize(64, -10.0, -33.0), pixelize(64, 350.0, -33.0));
    }

    #[test]
    fn test_nested_hierarchy() {
        for ra in [0.3, 44.9, 91.0, 179.99, 200.0, 271.5, 359.7] {
            for dec in [-89.9, -75.0, -41.8, -10.0, 0.0, 0.7, 41.9, 66.0, 89.95] {
                for order in 0..12u32 {
                    let coarse = pixelize(1 << order, ra, dec);
                    let fine = pixelize(1 << (order + 1), ra, dec);
                    assert_eq!(fine / 4, coarse, "({}, {}) order {}", ra, dec, order);
                }
            }
        }
    }

    #[test]
    fn test_centers_round_trip() {
        for order in 0..5u32 {
            let nside = 1u64 << order;
            for pix in 0..12 * nside * nside {
                let (theta, phi) = pix2ang_nest(nside, pix);
                assert_eq!(ang2pix_nest(nside, theta, phi), pix, "nside {}", nside);
            }
        }
    }

    #[test]
    fn test_base_center_position() {
        let (theta, phi) = pix2ang_nest(1, 0);
        assert!((libm::cos(theta) - 2.0 / 3.0).abs() < 1e-12);
        assert!((phi - PI / 4.0).abs() < 1e-12);

        let (theta, phi) = pix2ang_nest(1, 4);
        assert!((theta - FRAC_PI_2).abs() < 1e-12);
        assert!(phi.abs() < 1e-12);
    }

    #[test]
    fn test_max_pixrad() {
        // Base pixel 0: centre at z = 2/3 to the north pole.
        let expected = libm::acos(2.0 / 3.0);
        assert!((max_pixrad(1) - expected).abs() < 1e-12);
        assert!(max_pixrad(64) < max_pixrad(32));
        assert!(max_pixrad(256).to_degrees() < 0.3);
    }

    #[test]
    fn test_angular_separation_deg() {
        assert!(angular_separation_deg(0.0, 0.0, 0.0, 0.0).abs() < 1e-12);

        let dist = angular_separation_deg(0.0, 0.0, 90.0, 0.0);
        assert!((dist - 90.0).abs() < 1e-10);

        let dist = angular_separation_deg(0.0, 90.0, 0.0, -90.0);
        assert!((dist - 180.0).abs() < 1e-10);

        let dist = angular_separation_deg(0.0, 0.0, 180.0, 0.0);
        assert!((dist - 180.0).abs() < 1e-10);

        let dist = angular_separation_deg(359.95, 0.0, 0.05, 0.0);
        assert!((dist - 0.1).abs() < 1e-9);

        let dist = angular_separation_deg(0.0, 0.0, 0.1, 0.1);
        assert!(dist > 0.14 && dist < 0.15);
    }

    #[test]
    fn test_query_disc_contains_center() {
        for (ra, dec) in [(0.0, 0.0), (10.0, 0.0), (0.0, 90.0), (123.4, -89.5), (300.0, 41.8)] {
            let center = pixelize(32, ra, dec);
            assert!(query_disc_nest(32, ra, dec, 0.0).contains(&center));
            assert!(query_disc_nest(32, ra, dec, 5.0).contains(&center));
        }
    }

    #[test]
    fn test_query_disc_sorted_and_in_range() {
        let pixels = query_disc_nest(16, 200.0, -30.0, 10.0);
        assert!(!pixels.is_empty());
        assert!(pixels.windows(2).all(|w| w[0] < w[1]));
        assert!(pixels.iter().all(|&p| p < npix(16)));
    }

    #[test]
    fn test_query_disc_whole_sky() {
        assert_eq!(query_disc_nest(4, 0.0, 0.0, 180.0).len(), npix(4) as usize);
    }

    #[test]
    fn test_query_disc_no_false_negatives() {
        let nside = 32;
        let cases = [
            (10.0, 0.0, 1.0),
            (0.5, 89.0, 3.0),
            (359.5, -20.0, 2.5),
            (45.0, 41.81, 0.7),
            (270.0, -88.0, 4.0),
        ];
        for (ra, dec, radius) in cases {
            let pixels = query_disc_nest(nside, ra, dec, radius);
            let steps = 60;
            for i in 0..=steps {
                for j in 0..=steps {
                    let dec_p = (dec - radius + 2.0 * radius * i as f64 / steps as f64)
                        .clamp(-90.0, 90.0);
                    let ra_p = ra - 2.0 * radius / libm::cos(dec_p.to_radians()).max(0.05)
                        + 4.0 * radius / libm::cos(dec_p.to_radians()).max(0.05) * j as f64
                            / steps as f64;
                    let ra_p = ra_p.rem_euclid(360.0);
                    if angular_separation_deg(ra, dec, ra_p, dec_p) > radius {
                        continue;
                    }
                    let pix = pixelize(nside, ra_p, dec_p);
                    assert!(
                        pixels.binary_search(&pix).is_ok(),
                        "pixel {} of ({}, {}) missing from disc ({}, {}, {})",
                        pix,
                        ra_p,
                        dec_p,
                        ra,
                        dec,
                        radius
                    );
                }
            }
        }
    }
}
