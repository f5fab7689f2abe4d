//! Decoding of the `+CGNSINF` navigation sentence.
//!
//! The sentence is a single line of 21 comma-separated, position-indexed
//! fields. Fields the receiver has no value for are left empty (`,,`), and
//! decode to zero.

use std::fmt;
use std::str::FromStr;

use log::debug;

/// Number of fields in a `+CGNSINF` sentence.
pub const FIELD_COUNT: usize = 21;

/// Framing that may precede the payload. Each stripping pass removes the
/// first one that matches, in this order.
pub const FRAMING_PREFIXES: [&str; 3] = [
    "AT+CGNSINF\r\r\n+CGNSINF: ",
    "AT+CGNSINF\r\r\n",
    "+CGNSINF: ",
];

/// Status trailer of a successful response.
pub const SUCCESS_TERMINATOR: &str = "\r\n\r\nOK\r\n";

/// Field indices. 9, 13 and 17 are reserved by the sentence format.
mod field {
    pub const RUN_STATUS: usize = 0;
    pub const FIX_STATUS: usize = 1;
    pub const DATE_TIME: usize = 2;
    pub const LATITUDE: usize = 3;
    pub const LONGITUDE: usize = 4;
    pub const ALTITUDE: usize = 5;
    pub const SPEED: usize = 6;
    pub const COURSE: usize = 7;
    pub const FIX_MODE: usize = 8;
    pub const HDOP: usize = 10;
    pub const PDOP: usize = 11;
    pub const VDOP: usize = 12;
    pub const GPS_IN_VIEW: usize = 14;
    pub const GNSS_USED: usize = 15;
    pub const GLONASS_IN_VIEW: usize = 16;
    pub const CN0_MAX: usize = 18;
    pub const HPA: usize = 19;
    pub const VPA: usize = 20;
}

/// UTC date and time as reported, split into fixed-width pieces of the
/// `yyyyMMddhhmmss.sss` field. No calendar validation is done, and pieces
/// beyond the end of a short field are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GnssTimestamp {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
}

impl GnssTimestamp {
    fn from_field(field: &str) -> Self {
        let piece = |start: usize, end: usize| {
            let end = end.min(field.len());
            let start = start.min(end);
            field.get(start..end).unwrap_or_default().to_string()
        };
        Self {
            year: piece(0, 4),
            month: piece(4, 6),
            day: piece(6, 8),
            hour: piece(8, 10),
            minute: piece(10, 12),
            second: piece(12, 14),
        }
    }

    /// Returns `true` when the receiver reported no time at all.
    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
    }

    /// `[year, month, day, hour, minute, second]`
    pub fn parts(&self) -> [&str; 6] {
        [
            &self.year,
            &self.month,
            &self.day,
            &self.hour,
            &self.minute,
            &self.second,
        ]
    }
}

impl fmt::Display for GnssTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        write!(
            f,
            "{}-{}-{} {}:{}:{} UTC",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// One decoded `+CGNSINF` snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    /// 1 when the GNSS engine is powered.
    pub run_status: u8,
    /// 1 when a position fix is available.
    pub fix_status: u8,
    pub timestamp: GnssTimestamp,
    /// Degrees, negative south.
    pub latitude: f64,
    /// Degrees, negative west.
    pub longitude: f64,
    /// Meters above mean sea level.
    pub altitude: f64,
    /// km/h.
    pub speed_over_ground: f64,
    /// Degrees.
    pub course_over_ground: f64,
    pub fix_mode: u8,
    pub hdop: f64,
    pub pdop: f64,
    pub vdop: f64,
    pub gps_satellites_in_view: u32,
    pub gnss_satellites_used: u32,
    pub glonass_satellites_in_view: u32,
    /// dB-Hz.
    pub cn0_max: f64,
    /// Horizontal position accuracy, meters.
    pub hpa: f64,
    /// Vertical position accuracy, meters.
    pub vpa: f64,
}

impl TelemetryRecord {
    pub fn has_fix(&self) -> bool {
        self.fix_status == 1
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run status:    {}", self.run_status)?;
        writeln!(f, "fix status:    {} (mode {})", self.fix_status, self.fix_mode)?;
        writeln!(f, "time:          {}", self.timestamp)?;
        writeln!(f, "position:      {:.6}, {:.6}", self.latitude, self.longitude)?;
        writeln!(f, "altitude:      {:.1} m", self.altitude)?;
        writeln!(
            f,
            "speed/course:  {:.2} km/h, {:.1}°",
            self.speed_over_ground, self.course_over_ground
        )?;
        writeln!(f, "HDOP/PDOP/VDOP: {} / {} / {}", self.hdop, self.pdop, self.vdop)?;
        writeln!(
            f,
            "satellites:    {} GPS in view, {} GLONASS in view, {} used",
            self.gps_satellites_in_view, self.glonass_satellites_in_view, self.gnss_satellites_used
        )?;
        writeln!(f, "C/N0 max:      {} dB-Hz", self.cn0_max)?;
        write!(f, "accuracy:      {} m H, {} m V", self.hpa, self.vpa)
    }
}

/// Remove the command echo and/or `+CGNSINF: ` prefix from a raw response.
///
/// Line breaks around the framing are skipped, so a blank line between the
/// echo and the prefix is tolerated. Stripping repeats until nothing more
/// comes off, which makes a second call a no-op. Text without known framing
/// is returned unchanged.
pub fn strip_framing(raw: &str) -> &str {
    let mut text = raw;
    loop {
        let trimmed = text.trim_start_matches(['\r', '\n']);
        let next = FRAMING_PREFIXES
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix))
            .unwrap_or(trimmed);
        if next.len() == text.len() {
            return text;
        }
        text = next;
    }
}

/// Remove the trailing `\r\n\r\nOK\r\n`, if present.
pub fn strip_terminator(text: &str) -> &str {
    text.strip_suffix(SUCCESS_TERMINATOR).unwrap_or(text)
}

/// Decode a raw `AT+CGNSINF` response.
///
/// Returns `None` when the payload does not have exactly 21 fields or when a
/// non-empty numeric field does not parse. Empty fields decode to zero.
pub fn decode(raw: &str) -> Option<TelemetryRecord> {
    let payload = strip_terminator(strip_framing(raw));
    let fields: Vec<&str> = payload.split(',').collect();

    if fields.len() != FIELD_COUNT {
        debug!(
            "CGNSINF: expected {} fields, got {}: {:?}",
            FIELD_COUNT,
            fields.len(),
            payload
        );
        return None;
    }

    match decode_fields(&fields) {
        Ok(record) => Some(record),
        Err(BadField { index, value }) => {
            debug!("CGNSINF: field {} is not a number: {:?}", index, value);
            None
        }
    }
}

struct BadField {
    index: usize,
    value: String,
}

fn decode_fields(fields: &[&str]) -> Result<TelemetryRecord, BadField> {
    Ok(TelemetryRecord {
        run_status: number(fields, field::RUN_STATUS)?,
        fix_status: number(fields, field::FIX_STATUS)?,
        timestamp: GnssTimestamp::from_field(fields[field::DATE_TIME].trim()),
        latitude: number(fields, field::LATITUDE)?,
        longitude: number(fields, field::LONGITUDE)?,
        altitude: number(fields, field::ALTITUDE)?,
        speed_over_ground: number(fields, field::SPEED)?,
        course_over_ground: number(fields, field::COURSE)?,
        fix_mode: number(fields, field::FIX_MODE)?,
        hdop: number(fields, field::HDOP)?,
        pdop: number(fields, field::PDOP)?,
        vdop: number(fields, field::VDOP)?,
        gps_satellites_in_view: number(fields, field::GPS_IN_VIEW)?,
        gnss_satellites_used: number(fields, field::GNSS_USED)?,
        glonass_satellites_in_view: number(fields, field::GLONASS_IN_VIEW)?,
        cn0_max: number(fields, field::CN0_MAX)?,
        hpa: number(fields, field::HPA)?,
        vpa: number(fields, field::VPA)?,
    })
}

/// Parse the field at `index`, mapping an empty field to zero.
fn number<T: FromStr + Default>(fields: &[&str], index: usize) -> Result<T, BadField> {
    let value = fields[index].trim();
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse().map_err(|_| BadField {
        index,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIX: &str =
        "1,1,20241201111755.000,50.282724,18.680043,270.862,0.59,189.6,1,,2.5,2.6,0.9,,9,6,5,,43,,";
    const NO_FIX: &str = "1,0,20241201111750.000,,,,1.07,189.6,0,,,,,,8,0,4,,42,,";

    #[test]
    fn test_decode_reference_sentence() {
        let r = decode(FIX).unwrap();
        assert_eq!(r.run_status, 1);
        assert_eq!(r.fix_status, 1);
        assert_eq!(r.timestamp.parts(), ["2024", "12", "01", "11", "17", "55"]);
        assert_eq!(r.latitude, 50.282724);
        assert_eq!(r.longitude, 18.680043);
        assert_eq!(r.altitude, 270.862);
        assert_eq!(r.speed_over_ground, 0.59);
        assert_eq!(r.course_over_ground, 189.6);
        assert_eq!(r.fix_mode, 1);
        assert_eq!(r.hdop, 2.5);
        assert_eq!(r.pdop, 2.6);
        assert_eq!(r.vdop, 0.9);
        assert_eq!(r.gps_satellites_in_view, 9);
        assert_eq!(r.gnss_satellites_used, 6);
        assert_eq!(r.glonass_satellites_in_view, 5);
        assert_eq!(r.cn0_max, 43.0);
        assert_eq!(r.hpa, 0.0);
        assert_eq!(r.vpa, 0.0);
        assert!(r.has_fix());
    }

    #[test]
    fn test_decode_full_modem_response() {
        let raw = format!("AT+CGNSINF\r\r\n+CGNSINF: {FIX}\r\n\r\nOK\r\n");
        assert_eq!(decode(&raw), decode(FIX));
    }

    #[test]
    fn test_decode_with_blank_line_after_echo() {
        let raw = format!("AT+CGNSINF\r\r\n\r\n+CGNSINF: {FIX}\r\n\r\nOK\r\n");
        assert_eq!(decode(&raw), decode(FIX));
    }

    #[test]
    fn test_decode_without_echo() {
        let raw = format!("\r\n+CGNSINF: {FIX}\r\n\r\nOK\r\n");
        assert_eq!(decode(&raw), decode(FIX));
    }

    #[test]
    fn test_decode_without_fix_defaults_to_zero() {
        let r = decode(&format!("+CGNSINF: {NO_FIX}")).unwrap();
        assert!(!r.has_fix());
        assert_eq!(r.latitude, 0.0);
        assert_eq!(r.longitude, 0.0);
        assert_eq!(r.altitude, 0.0);
        assert_eq!(r.speed_over_ground, 1.07);
        assert_eq!(r.hdop, 0.0);
        assert_eq!(r.pdop, 0.0);
        assert_eq!(r.vdop, 0.0);
        assert_eq!(r.gps_satellites_in_view, 8);
        assert_eq!(r.gnss_satellites_used, 0);
        assert_eq!(r.glonass_satellites_in_view, 4);
        assert_eq!(r.cn0_max, 42.0);
    }

    #[test]
    fn test_decode_all_empty() {
        let raw = ",".repeat(FIELD_COUNT - 1);
        let r = decode(&raw).unwrap();
        assert_eq!(r, TelemetryRecord::default());
        assert!(r.timestamp.is_empty());
    }

    #[test]
    fn test_each_empty_numeric_field_is_zero() {
        let base: Vec<&str> = FIX.split(',').collect();
        for index in (0..FIELD_COUNT).filter(|&i| i != field::DATE_TIME) {
            let mut fields = base.clone();
            fields[index] = "";
            let r = decode(&fields.join(",")).unwrap_or_else(|| panic!("field {index}"));
            let zero = TelemetryRecord::default();
            match index {
                field::RUN_STATUS => assert_eq!(r.run_status, zero.run_status),
                field::FIX_STATUS => assert_eq!(r.fix_status, zero.fix_status),
                field::LATITUDE => assert_eq!(r.latitude, 0.0),
                field::LONGITUDE => assert_eq!(r.longitude, 0.0),
                field::ALTITUDE => assert_eq!(r.altitude, 0.0),
                field::SPEED => assert_eq!(r.speed_over_ground, 0.0),
                field::COURSE => assert_eq!(r.course_over_ground, 0.0),
                field::FIX_MODE => assert_eq!(r.fix_mode, 0),
                field::HDOP => assert_eq!(r.hdop, 0.0),
                field::PDOP => assert_eq!(r.pdop, 0.0),
                field::VDOP => assert_eq!(r.vdop, 0.0),
                field::GPS_IN_VIEW => assert_eq!(r.gps_satellites_in_view, 0),
                field::GNSS_USED => assert_eq!(r.gnss_satellites_used, 0),
                field::GLONASS_IN_VIEW => assert_eq!(r.glonass_satellites_in_view, 0),
                field::CN0_MAX => assert_eq!(r.cn0_max, 0.0),
                field::HPA => assert_eq!(r.hpa, 0.0),
                field::VPA => assert_eq!(r.vpa, 0.0),
                _ => assert_eq!(r, decode(FIX).unwrap()),
            }
        }
    }

    #[test]
    fn test_reserved_fields_are_ignored() {
        let mut fields: Vec<&str> = FIX.split(',').collect();
        fields[9] = "x";
        fields[13] = "y";
        fields[17] = "z";
        assert_eq!(decode(&fields.join(",")), decode(FIX));
    }

    #[test]
    fn test_wrong_field_count_is_absent() {
        for count in [1, 2, 20, 22, 40] {
            let raw = vec!["1"; count].join(",");
            assert_eq!(decode(&raw), None, "{count} fields");
        }
        assert_eq!(decode(""), None);
        assert_eq!(decode("AT+CGNSINF\r\r\n+CG"), None);
        assert_eq!(decode("\r\nERROR\r\n"), None);
        assert_eq!(decode(&format!("{FIX},")), None);
    }

    #[test]
    fn test_unparsable_number_is_absent() {
        let raw = FIX.replacen("50.282724", "north", 1);
        assert_eq!(decode(&raw), None);
    }

    #[test]
    fn test_short_date_time_field() {
        let raw = FIX.replacen("20241201111755.000", "2024120", 1);
        let r = decode(&raw).unwrap();
        assert_eq!(r.timestamp.parts(), ["2024", "12", "0", "", "", ""]);
    }

    #[test]
    fn test_date_time_is_not_validated() {
        let raw = FIX.replacen("20241201111755.000", "20249999999999", 1);
        let r = decode(&raw).unwrap();
        assert_eq!(r.timestamp.parts(), ["2024", "99", "99", "99", "99", "99"]);
    }

    #[test]
    fn test_strip_framing_precedence() {
        assert_eq!(strip_framing("AT+CGNSINF\r\r\n+CGNSINF: 1,2"), "1,2");
        assert_eq!(strip_framing("AT+CGNSINF\r\r\n1,2"), "1,2");
        assert_eq!(strip_framing("+CGNSINF: 1,2"), "1,2");
        assert_eq!(strip_framing("1,2"), "1,2");
        assert_eq!(strip_framing("AT+CGNSINF\r\r\n\r\n+CGNSINF: 1,2"), "1,2");
        assert_eq!(strip_framing("garbage +CGNSINF: 1,2"), "garbage +CGNSINF: 1,2");
    }

    #[test]
    fn test_strip_framing_is_idempotent() {
        let inputs = [
            format!("AT+CGNSINF\r\r\n+CGNSINF: {FIX}\r\n\r\nOK\r\n"),
            format!("AT+CGNSINF\r\r\n{FIX}"),
            format!("+CGNSINF: {FIX}"),
            format!("\r\n+CGNSINF: {NO_FIX}"),
            format!("AT+CGNSINF\r\r\n\r\n+CGNSINF: {FIX}"),
            "AT+CGNSINF\r\r\n\r\n+CGNSINF: 1,2".to_string(),
            "\r\nAT+CGNSINF\r\r\n\r\n1,2".to_string(),
            "+CGNSINF: +CGNSINF: 1,2".to_string(),
            "AT+CGNSINF\r\r\nAT+CGNSINF\r\r\n1,2".to_string(),
            "+CGNSINF: \r\n".to_string(),
            "\r\n\r\n".to_string(),
            FIX.to_string(),
            String::new(),
        ];
        for input in &inputs {
            let once = strip_framing(input);
            assert_eq!(strip_framing(once), once);
        }
    }

    #[test]
    fn test_terminator_only_stripped_when_present() {
        assert_eq!(strip_terminator("1,2\r\n\r\nOK\r\n"), "1,2");
        assert_eq!(strip_terminator("1,2"), "1,2");
        assert_eq!(strip_terminator("1,OK"), "1,OK");
    }

    #[test]
    fn test_display_mentions_position() {
        let text = decode(FIX).unwrap().to_string();
        assert!(text.contains("50.282724, 18.680043"));
        assert!(text.contains("2024-12-01 11:17:55 UTC"));
    }
}
