//! Tile filename utilities.
//!
//! Tiles follow the SRTM naming convention `{N|S}{lat}{E|W}{lon}.hgt`:
//!
//! - Latitude: 2 digits with N/S prefix (e.g., N51, S12)
//! - Longitude: 3 digits with E/W prefix (e.g., E138, W001)
//!
//! The name identifies the **southwest corner** of the 1° × 1° cell, so both
//! components are the `floor` of the coordinate. A point at longitude −0.12
//! lives in the `W001` column, not `W000`.
//!
//! Compressed tiles sit next to the raw ones as `{name}.hgt.zip` (3 arc-second
//! distribution) or `{name}.SRTMGL1.hgt.zip` (1 arc-second distribution).

/// Extension of an uncompressed tile.
pub const HGT_EXT: &str = ".hgt";

/// Extension appended to a tile filename for its zip archive.
pub const ZIP_EXT: &str = ".zip";

/// Infix used by the SRTMGL1 distribution between tile name and extension.
const SRTMGL1_INFIX: &str = ".SRTMGL1";

/// Build the bare tile name (no extension) for a southwest corner.
///
/// # Examples
///
/// ```
/// use relief::filename::tile_name;
///
/// assert_eq!(tile_name(51, -1), "N51W001");
/// assert_eq!(tile_name(-13, -78), "S13W078");
/// assert_eq!(tile_name(0, 0), "N00E000");
/// ```
pub fn tile_name(lat: i32, lon: i32) -> String {
    let lat_prefix = if lat >= 0 { 'N' } else { 'S' };
    let lon_prefix = if lon >= 0 { 'E' } else { 'W' };

    format!(
        "{}{:02}{}{:03}",
        lat_prefix,
        lat.unsigned_abs(),
        lon_prefix,
        lon.unsigned_abs()
    )
}

/// Convert latitude and longitude to a `.hgt` filename.
///
/// # Examples
///
/// ```
/// use relief::filename::lat_lon_to_filename;
///
/// assert_eq!(lat_lon_to_filename(51.5, -0.12), "N51W001.hgt");
/// assert_eq!(lat_lon_to_filename(-12.3, -77.1), "S13W078.hgt");
/// assert_eq!(lat_lon_to_filename(0.5, -0.5), "N00W001.hgt");
/// ```
pub fn lat_lon_to_filename(lat: f64, lon: f64) -> String {
    format!(
        "{}{}",
        tile_name(lat.floor() as i32, lon.floor() as i32),
        HGT_EXT
    )
}

/// Archive filenames to try for a tile name, in lookup order.
///
/// ```
/// use relief::filename::archive_names;
///
/// assert_eq!(
///     archive_names("N51W001"),
///     ["N51W001.hgt.zip".to_string(), "N51W001.SRTMGL1.hgt.zip".to_string()]
/// );
/// ```
pub fn archive_names(name: &str) -> [String; 2] {
    [
        format!("{name}{HGT_EXT}{ZIP_EXT}"),
        format!("{name}{SRTMGL1_INFIX}{HGT_EXT}{ZIP_EXT}"),
    ]
}

/// Parse a tile filename to extract the southwest corner.
///
/// Accepts bare names, `.hgt` files and both archive spellings, with or
/// without a leading path.
///
/// # Examples
///
/// ```
/// use relief::filename::filename_to_lat_lon;
///
/// assert_eq!(filename_to_lat_lon("N51W001.hgt"), Some((51, -1)));
/// assert_eq!(filename_to_lat_lon("S12W077.hgt.zip"), Some((-12, -77)));
/// assert_eq!(filename_to_lat_lon("/srv/N35E138.SRTMGL1.hgt.zip"), Some((35, 138)));
/// assert_eq!(filename_to_lat_lon("invalid"), None);
/// ```
pub fn filename_to_lat_lon(filename: &str) -> Option<(i32, i32)> {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);

    let name = name.strip_suffix(ZIP_EXT).unwrap_or(name);
    let name = name.strip_suffix(HGT_EXT).unwrap_or(name);
    let name = name.strip_suffix(SRTMGL1_INFIX).unwrap_or(name);

    // Must be exactly 7 ASCII characters: N00E000
    if name.len() != 7 || !name.is_ascii() {
        return None;
    }

    let bytes = name.as_bytes();

    let lat_sign = match bytes[0] {
        b'N' | b'n' => 1,
        b'S' | b's' => -1,
        _ => return None,
    };
    let lat: i32 = name[1..3].parse().ok()?;

    let lon_sign = match bytes[3] {
        b'E' | b'e' => 1,
        b'W' | b'w' => -1,
        _ => return None,
    };
    let lon: i32 = name[4..7].parse().ok()?;

    Some((lat * lat_sign, lon * lon_sign))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_coords() {
        assert_eq!(lat_lon_to_filename(35.5, 138.7), "N35E138.hgt");
        assert_eq!(lat_lon_to_filename(0.5, 0.5), "N00E000.hgt");
        assert_eq!(lat_lon_to_filename(59.9, 179.9), "N59E179.hgt");
    }

    #[test]
    fn test_negative_coords() {
        // floor(-0.12) = -1
        assert_eq!(lat_lon_to_filename(51.5, -0.12), "N51W001.hgt");
        assert_eq!(lat_lon_to_filename(-0.5, -0.5), "S01W001.hgt");
        assert_eq!(lat_lon_to_filename(-1.0, -1.0), "S01W001.hgt");
        assert_eq!(lat_lon_to_filename(-59.9, -179.9), "S60W180.hgt");
    }

    #[test]
    fn test_boundary_cases() {
        assert_eq!(lat_lon_to_filename(35.0, 138.0), "N35E138.hgt");
        assert_eq!(lat_lon_to_filename(-35.0, -138.0), "S35W138.hgt");
        assert_eq!(lat_lon_to_filename(0.0, 0.0), "N00E000.hgt");
        assert_eq!(lat_lon_to_filename(-0.1, -0.1), "S01W001.hgt");
    }

    #[test]
    fn test_archive_names() {
        let [srtm3, srtm1] = archive_names("S13W078");
        assert_eq!(srtm3, "S13W078.hgt.zip");
        assert_eq!(srtm1, "S13W078.SRTMGL1.hgt.zip");
    }

    #[test]
    fn test_parse_filename() {
        assert_eq!(filename_to_lat_lon("N35E138.hgt"), Some((35, 138)));
        assert_eq!(filename_to_lat_lon("S12W077"), Some((-12, -77)));
        assert_eq!(filename_to_lat_lon("N00E000.hgt"), Some((0, 0)));
        assert_eq!(filename_to_lat_lon("n51w001.hgt"), Some((51, -1)));
    }

    #[test]
    fn test_parse_filename_with_path() {
        assert_eq!(
            filename_to_lat_lon("/path/to/data/N35E138.hgt.zip"),
            Some((35, 138))
        );
        assert_eq!(
            filename_to_lat_lon("C:\\data\\S12W077.hgt"),
            Some((-12, -77))
        );
    }

    #[test]
    fn test_parse_filename_invalid() {
        assert_eq!(filename_to_lat_lon("invalid"), None);
        assert_eq!(filename_to_lat_lon("N35E13.hgt"), None);
        assert_eq!(filename_to_lat_lon("X35E138.hgt"), None);
        assert_eq!(filename_to_lat_lon("N35X138.hgt"), None);
        assert_eq!(filename_to_lat_lon("NAAE138.hgt"), None);
        assert_eq!(filename_to_lat_lon("N3€E13.hgt"), None);
    }

    #[test]
    fn test_name_parse_agree() {
        for (lat, lon) in [(51.5, -0.12), (-12.3, -77.1), (-0.5, 0.5), (59.9, 179.9)] {
            let filename = lat_lon_to_filename(lat, lon);
            assert_eq!(
                filename_to_lat_lon(&filename),
                Some((lat.floor() as i32, lon.floor() as i32))
            );
        }
    }
}
