use serde::{Deserialize, Serialize};

pub const GGA_TAG: &[u8] = b"$GPGGA";

const MS_PER_HOUR: u32 = 3_600_000;
const MS_PER_MINUTE: u32 = 60_000;
const MS_PER_SECOND: u32 = 1_000;

/// Digits kept after the decimal point of a minutes field.
const MINUTE_FRACTION_DIGITS: usize = 5;
const MINUTE_FRACTION_SCALE: i64 = 100_000;

/// A GPGGA fix in integer units.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GgaFix {
    /// UTC time of day
    pub time_ms: u32,
    /// 1/100000 arc-minute, negative south
    pub lat: i32,
    /// 1/100000 arc-minute, negative west
    pub lon: i32,
    /// Height above the geoid (mean sea level)
    pub alt_mm: i32,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GgaField {
    Time,
    Latitude,
    LatitudeHemisphere,
    Longitude,
    LongitudeHemisphere,
    FixQuality,
    SatelliteCount,
    Hdop,
    Altitude,
    AltitudeUnits,
    GeoidalSeparation,
    GeoidalSeparationUnits,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GgaParseError {
    WrongSentenceType,
    MissingField(GgaField),
    MalformedField(GgaField),
}

/// Parses one `$GPGGA` sentence.
///
/// The checksum after `*` is not validated, it is cut off together with
/// the line ending before the fields are split.
pub fn parse_gga(sentence: &[u8]) -> Result<GgaFix, GgaParseError> {
    let body = strip_trailer(sentence);
    let mut fields = body.split(|b| *b == b',');

    if fields.next() != Some(GGA_TAG) {
        return Err(GgaParseError::WrongSentenceType);
    }

    let time_ms = parse_time(required(&mut fields, GgaField::Time)?)?;

    let lat_field = required(&mut fields, GgaField::Latitude)?;
    let mut lat = parse_coordinate(lat_field, 2, GgaField::Latitude)?;
    match required(&mut fields, GgaField::LatitudeHemisphere)? {
        b"N" => {}
        b"S" => lat = -lat,
        _ => return Err(GgaParseError::MalformedField(GgaField::LatitudeHemisphere)),
    }

    let lon_field = required(&mut fields, GgaField::Longitude)?;
    let mut lon = parse_coordinate(lon_field, 3, GgaField::Longitude)?;
    match required(&mut fields, GgaField::LongitudeHemisphere)? {
        b"E" => {}
        b"W" => lon = -lon,
        _ => return Err(GgaParseError::MalformedField(GgaField::LongitudeHemisphere)),
    }

    // only their presence matters
    for field in [GgaField::FixQuality, GgaField::SatelliteCount, GgaField::Hdop] {
        fields.next().ok_or(GgaParseError::MissingField(field))?;
    }

    let alt = parse_milli(required(&mut fields, GgaField::Altitude)?, GgaField::Altitude)?;
    let alt = apply_units(
        alt,
        required(&mut fields, GgaField::AltitudeUnits)?,
        GgaField::AltitudeUnits,
    )?;
    let geoidal = parse_milli(
        required(&mut fields, GgaField::GeoidalSeparation)?,
        GgaField::GeoidalSeparation,
    )?;
    let geoidal = apply_units(
        geoidal,
        required(&mut fields, GgaField::GeoidalSeparationUnits)?,
        GgaField::GeoidalSeparationUnits,
    )?;

    let alt_mm = i32::try_from(alt - geoidal)
        .map_err(|_| GgaParseError::MalformedField(GgaField::Altitude))?;

    Ok(GgaFix {
        time_ms,
        lat,
        lon,
        alt_mm,
    })
}

fn strip_trailer(sentence: &[u8]) -> &[u8] {
    let end = sentence
        .iter()
        .position(|b| *b == b'*')
        .unwrap_or(sentence.len());
    let mut body = &sentence[..end];
    while let [rest @ .., b'\r' | b'\n' | 0] = body {
        body = rest;
    }
    body
}

/// Next field, an empty one counts as missing.
fn required<'a>(
    fields: &mut impl Iterator<Item = &'a [u8]>,
    field: GgaField,
) -> Result<&'a [u8], GgaParseError> {
    match fields.next() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(GgaParseError::MissingField(field)),
    }
}

fn parse_digits(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
    })
}

/// Reads a fraction as exactly `places` digits, padding with zeros and
/// dropping anything past `places`.
fn parse_fraction(digits: &[u8], places: usize) -> Option<u32> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let mut value = 0u32;
    for i in 0..places {
        let digit = digits.get(i).map_or(0, |b| b - b'0');
        value = value * 10 + u32::from(digit);
    }
    Some(value)
}

/// Splits `whole.fraction`, the fraction being optional.
fn split_decimal(value: &[u8]) -> (&[u8], Option<&[u8]>) {
    match value.iter().position(|b| *b == b'.') {
        Some(dot) => (&value[..dot], Some(&value[dot + 1..])),
        None => (value, None),
    }
}

/// `HHMMSS[.fff]`
fn parse_time(value: &[u8]) -> Result<u32, GgaParseError> {
    let malformed = GgaParseError::MalformedField(GgaField::Time);

    let (whole, fraction) = split_decimal(value);
    if whole.len() != 6 {
        return Err(malformed);
    }

    let hours = parse_digits(&whole[0..2]).ok_or(malformed)?;
    let minutes = parse_digits(&whole[2..4]).ok_or(malformed)?;
    let seconds = parse_digits(&whole[4..6]).ok_or(malformed)?;
    let ms = match fraction {
        Some(fraction) => parse_fraction(fraction, 3).ok_or(malformed)?,
        None => 0,
    };

    Ok(hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND + ms)
}

/// `DDMM.mmmmm` (or `DDDMM.mmmmm`) into 1/100000 arc-minute.
fn parse_coordinate(
    value: &[u8],
    degree_digits: usize,
    field: GgaField,
) -> Result<i32, GgaParseError> {
    let malformed = GgaParseError::MalformedField(field);

    let (whole, fraction) = split_decimal(value);
    if whole.len() != degree_digits + 2 {
        return Err(malformed);
    }

    let degrees = parse_digits(&whole[..degree_digits]).ok_or(malformed)?;
    let minutes = parse_digits(&whole[degree_digits..]).ok_or(malformed)?;
    let fraction = match fraction {
        Some(fraction) => parse_fraction(fraction, MINUTE_FRACTION_DIGITS).ok_or(malformed)?,
        None => 0,
    };

    let total = (i64::from(degrees) * 60 + i64::from(minutes)) * MINUTE_FRACTION_SCALE
        + i64::from(fraction);
    i32::try_from(total).map_err(|_| malformed)
}

/// A signed decimal length, in thousandths of its unit.
fn parse_milli(value: &[u8], field: GgaField) -> Result<i64, GgaParseError> {
    let malformed = GgaParseError::MalformedField(field);

    let (negative, magnitude) = match value {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        _ => (false, value),
    };

    let (whole, fraction) = split_decimal(magnitude);
    let whole = if whole.is_empty() && fraction.is_some() {
        0
    } else {
        parse_digits(whole).ok_or(malformed)?
    };
    let fraction = match fraction {
        Some(fraction) => parse_fraction(fraction, 3).ok_or(malformed)?,
        None => 0,
    };

    let mut length = i64::from(whole) * 1000 + i64::from(fraction);
    if negative {
        length = -length;
    }
    Ok(length)
}

fn apply_units(length: i64, units: &[u8], units_field: GgaField) -> Result<i64, GgaParseError> {
    match units {
        b"M" => Ok(length),
        // feet, as 10/33 rather than 0.3048
        b"F" => Ok(length * 10 / 33),
        _ => Err(GgaParseError::MalformedField(units_field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::GeoFix;
    use approx::assert_relative_eq;

    const REFERENCE: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";

    #[test]
    fn reference_sentence() {
        let fix = parse_gga(REFERENCE).unwrap();
        assert_eq!(fix.time_ms, 12 * 3_600_000 + 35 * 60_000 + 19 * 1_000);
        assert_eq!(fix.lat, (48 * 60 + 7) * 100_000 + 3_800);
        assert_eq!(fix.lon, (11 * 60 + 31) * 100_000);
        assert!(fix.lat > 0);
        assert!(fix.lon > 0);
        assert_eq!(fix.alt_mm, 545_400 - 46_900);
    }

    #[test]
    fn checksum_and_line_ending_are_ignored() {
        let with_trailer =
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n")
                .unwrap();
        assert_eq!(with_trailer, parse_gga(REFERENCE).unwrap());
    }

    #[test]
    fn south_and_west_negate() {
        let north_east = parse_gga(REFERENCE).unwrap();
        let south_west =
            parse_gga(b"$GPGGA,123519,4807.038,S,01131.000,W,1,08,0.9,545.4,M,46.9,M,,").unwrap();
        assert_eq!(south_west.lat, -north_east.lat);
        assert_eq!(south_west.lon, -north_east.lon);
        assert_eq!(south_west.alt_mm, north_east.alt_mm);
        assert_eq!(south_west.time_ms, north_east.time_ms);
    }

    #[test]
    fn other_sentences_are_wrong_type() {
        assert_eq!(
            parse_gga(b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n"),
            Err(GgaParseError::WrongSentenceType)
        );
        assert_eq!(parse_gga(b""), Err(GgaParseError::WrongSentenceType));
    }

    #[test]
    fn truncated_sentence_reports_missing_field() {
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N\r\n"),
            Err(GgaParseError::MissingField(GgaField::Longitude))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08"),
            Err(GgaParseError::MissingField(GgaField::Hdop))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9"),
            Err(GgaParseError::MissingField(GgaField::GeoidalSeparationUnits))
        );
    }

    #[test]
    fn bad_value_is_reported_before_missing_units() {
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,5x5.4"),
            Err(GgaParseError::MalformedField(GgaField::Altitude))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,4x.9"),
            Err(GgaParseError::MalformedField(GgaField::GeoidalSeparation))
        );
    }

    #[test]
    fn no_fix_sentence_is_rejected() {
        assert_eq!(
            parse_gga(b"$GPGGA,,,,,,0,00,99.99,,,,,,*48\r\n"),
            Err(GgaParseError::MissingField(GgaField::Time))
        );
    }

    #[test]
    fn bad_hemisphere_is_malformed() {
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,X,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::LatitudeHemisphere))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,N,1,08,0.9,545.4,M,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::LongitudeHemisphere))
        );
    }

    #[test]
    fn bad_numbers_are_malformed() {
        assert_eq!(
            parse_gga(b"$GPGGA,12351,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::Time))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,48O7.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::Latitude))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,1131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::Longitude))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,5x5.4,M,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::Altitude))
        );
        assert_eq!(
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,K,46.9,M,,"),
            Err(GgaParseError::MalformedField(GgaField::AltitudeUnits))
        );
    }

    #[test]
    fn fractional_seconds_become_milliseconds() {
        let fix = parse_gga(b"$GPGGA,000001.25,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,")
            .unwrap();
        assert_eq!(fix.time_ms, 1_250);

        let fix =
            parse_gga(b"$GPGGA,235959.1234,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,")
                .unwrap();
        assert_eq!(fix.time_ms, 23 * 3_600_000 + 59 * 60_000 + 59 * 1_000 + 123);
    }

    #[test]
    fn minute_fraction_is_padded_and_truncated() {
        let fix =
            parse_gga(b"$GPGGA,123519,4807.0381234,N,01131.5,E,1,08,0.9,545.4,M,46.9,M,,").unwrap();
        assert_eq!(fix.lat, (48 * 60 + 7) * 100_000 + 3_812);
        assert_eq!(fix.lon, (11 * 60 + 31) * 100_000 + 50_000);
    }

    #[test]
    fn feet_use_ten_over_thirty_three() {
        let fix =
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,1000.0,F,33.0,F,,").unwrap();
        // 1_000_000 * 10 / 33 - 33_000 * 10 / 33
        assert_eq!(fix.alt_mm, 303_030 - 10_000);
    }

    #[test]
    fn negative_lengths_keep_their_sign() {
        let fix =
            parse_gga(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,-12.5,M,-30.25,M,,").unwrap();
        assert_eq!(fix.alt_mm, -12_500 + 30_250);
    }

    #[test]
    fn agrees_with_nmea_crate() {
        let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";
        let nmea::ParseResult::GGA(reference) = nmea::parse_str(sentence).unwrap() else {
            panic!("expected a GGA sentence");
        };
        let fix = parse_gga(sentence.as_bytes()).unwrap();

        let lat = GeoFix::from_arc_minutes_e5(fix.lat).unwrap().to_degrees();
        let lon = GeoFix::from_arc_minutes_e5(fix.lon).unwrap().to_degrees();
        assert_relative_eq!(lat, reference.latitude.unwrap(), epsilon = 1e-6);
        assert_relative_eq!(lon, reference.longitude.unwrap(), epsilon = 1e-6);

        let alt_m = f64::from(reference.altitude.unwrap())
            - f64::from(reference.geoid_separation.unwrap());
        assert_relative_eq!(f64::from(fix.alt_mm) / 1000.0, alt_m, epsilon = 1e-3);
    }
}
