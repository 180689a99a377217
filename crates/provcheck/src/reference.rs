//! Static reference tables used by validators and cross-field checks.
//!
//! Area codes, ZIP zones and census regions cover the US states, DC and
//! Puerto Rico. Lookups that miss a table return `None` so callers can
//! treat the comparison as not applicable.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// USPS codes accepted as a state value.
pub const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "PR", "VI", "GU", "AS", "MP",
];

/// Professional credentials recognized by the credential validator.
pub const CREDENTIALS: &[&str] = &[
    "MD", "DO", "NP", "PA", "PA-C", "APRN", "CNM", "CRNA", "RN", "LPN", "DDS", "DMD", "DPM",
    "OD", "DC", "PHD", "PSYD", "LCSW", "LMFT", "LPC", "PT", "DPT", "OT", "PHARMD", "RD", "AUD",
    "MBBS",
];

/// Census region of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Northeast,
    Midwest,
    South,
    West,
}

/// Scope-of-practice family for credentials with a restricted specialty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PracticeFamily {
    Dental,
    Podiatry,
    Optometry,
    Chiropractic,
}

impl PracticeFamily {
    /// Specialty keywords that belong to this family.
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            PracticeFamily::Dental => &[
                "dentist",
                "dental",
                "orthodont",
                "periodont",
                "endodont",
                "prosthodont",
                "oral surgery",
                "maxillofacial",
            ],
            PracticeFamily::Podiatry => &["podiat", "foot"],
            PracticeFamily::Optometry => &["optometr", "vision care"],
            PracticeFamily::Chiropractic => &["chiropract"],
        }
    }

    const ALL: [PracticeFamily; 4] = [
        PracticeFamily::Dental,
        PracticeFamily::Podiatry,
        PracticeFamily::Optometry,
        PracticeFamily::Chiropractic,
    ];
}

static AREA_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("AL", &["205", "251", "256", "334"]),
        ("AK", &["907"]),
        ("AZ", &["480", "520", "602", "623", "928"]),
        ("AR", &["479", "501", "870"]),
        (
            "CA",
            &[
                "209", "213", "310", "323", "408", "415", "510", "530", "559", "562", "619",
                "626", "650", "657", "661", "707", "714", "760", "805", "818", "831", "858",
                "909", "916", "925", "949", "951",
            ],
        ),
        ("CO", &["303", "719", "720", "970"]),
        ("CT", &["203", "475", "860"]),
        ("DE", &["302"]),
        ("DC", &["202"]),
        (
            "FL",
            &[
                "239", "305", "321", "352", "386", "407", "561", "727", "754", "772", "786",
                "813", "850", "863", "904", "941", "954",
            ],
        ),
        ("GA", &["229", "404", "470", "478", "678", "706", "762", "770", "912"]),
        ("HI", &["808"]),
        ("ID", &["208"]),
        (
            "IL",
            &["217", "224", "309", "312", "618", "630", "708", "773", "815", "847", "872"],
        ),
        ("IN", &["219", "260", "317", "574", "765", "812"]),
        ("IA", &["319", "515", "563", "641", "712"]),
        ("KS", &["316", "620", "785", "913"]),
        ("KY", &["270", "502", "606", "859"]),
        ("LA", &["225", "318", "337", "504", "985"]),
        ("ME", &["207"]),
        ("MD", &["240", "301", "410", "443"]),
        ("MA", &["339", "351", "413", "508", "617", "774", "781", "857", "978"]),
        (
            "MI",
            &["231", "248", "269", "313", "517", "586", "616", "734", "810", "906", "947", "989"],
        ),
        ("MN", &["218", "320", "507", "612", "651", "763", "952"]),
        ("MS", &["228", "601", "662"]),
        ("MO", &["314", "417", "573", "636", "660", "816"]),
        ("MT", &["406"]),
        ("NE", &["308", "402"]),
        ("NV", &["702", "725", "775"]),
        ("NH", &["603"]),
        ("NJ", &["201", "551", "609", "732", "848", "856", "862", "908", "973"]),
        ("NM", &["505", "575"]),
        (
            "NY",
            &[
                "212", "315", "347", "516", "518", "585", "607", "631", "646", "716", "718",
                "845", "914", "917", "929",
            ],
        ),
        ("NC", &["252", "336", "704", "828", "910", "919", "980", "984"]),
        ("ND", &["701"]),
        ("OH", &["216", "234", "330", "419", "440", "513", "567", "614", "740", "937"]),
        ("OK", &["405", "539", "580", "918"]),
        ("OR", &["458", "503", "541", "971"]),
        ("PA", &["215", "267", "412", "484", "570", "610", "717", "724", "814", "878"]),
        ("RI", &["401"]),
        ("SC", &["803", "843", "864"]),
        ("SD", &["605"]),
        ("TN", &["423", "615", "629", "731", "865", "901", "931"]),
        (
            "TX",
            &[
                "210", "214", "254", "281", "325", "346", "361", "409", "430", "432", "469",
                "512", "682", "713", "737", "806", "817", "830", "832", "903", "915", "936",
                "940", "956", "972", "979",
            ],
        ),
        ("UT", &["385", "435", "801"]),
        ("VT", &["802"]),
        ("VA", &["276", "434", "540", "571", "703", "757", "804"]),
        ("WA", &["206", "253", "360", "425", "509"]),
        ("WV", &["304", "681"]),
        ("WI", &["262", "414", "608", "715", "920"]),
        ("WY", &["307"]),
        ("PR", &["787", "939"]),
    ];

    table
        .iter()
        .flat_map(|(state, codes)| codes.iter().map(move |code| (*code, *state)))
        .collect()
});

static ZIP_ZONES: Lazy<HashMap<char, &'static [&'static str]>> = Lazy::new(|| {
    let mut zones: HashMap<char, &'static [&'static str]> = HashMap::new();
    zones.insert('0', &["CT", "MA", "ME", "NH", "NJ", "NY", "PR", "RI", "VT", "VI"]);
    zones.insert('1', &["DE", "NY", "PA"]);
    zones.insert('2', &["DC", "MD", "NC", "SC", "VA", "WV"]);
    zones.insert('3', &["AL", "FL", "GA", "MS", "TN"]);
    zones.insert('4', &["IN", "KY", "MI", "OH"]);
    zones.insert('5', &["IA", "MN", "MT", "ND", "SD", "WI"]);
    zones.insert('6', &["IL", "KS", "MO", "NE"]);
    zones.insert('7', &["AR", "LA", "OK", "TX"]);
    zones.insert('8', &["AZ", "CO", "ID", "NM", "NV", "UT", "WY"]);
    zones.insert('9', &["AK", "CA", "HI", "OR", "WA", "GU", "AS", "MP"]);
    zones
});

/// Normalize a state value to an upper-case USPS code.
pub fn normalize_state(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

/// Check if a value is a known USPS state/territory code.
pub fn is_state_code(state: &str) -> bool {
    STATE_CODES.contains(&normalize_state(state).as_str())
}

/// Normalize a credential for lookup (`M.D.` -> `MD`).
pub fn normalize_credential(credential: &str) -> String {
    credential
        .trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|c| !matches!(c, '.' | ' '))
        .collect()
}

/// Check if a credential is in the known set.
pub fn is_known_credential(credential: &str) -> bool {
    CREDENTIALS.contains(&normalize_credential(credential).as_str())
}

/// Extract the ten NANP digits from a phone string.
pub fn phone_digits(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Some(digits),
        11 if digits.starts_with('1') => Some(digits[1..].to_string()),
        _ => None,
    }
}

/// State served by an area code.
pub fn area_code_state(area_code: &str) -> Option<&'static str> {
    AREA_CODES.get(area_code).copied()
}

/// States whose ZIP codes begin with the given digit.
pub fn zip_zone_states(zip: &str) -> Option<&'static [&'static str]> {
    zip.trim().chars().next().and_then(|c| ZIP_ZONES.get(&c).copied())
}

/// Census region of a state (None for territories and unknown codes).
pub fn state_region(state: &str) -> Option<Region> {
    let region = match normalize_state(state).as_str() {
        "CT" | "ME" | "MA" | "NH" | "RI" | "VT" | "NJ" | "NY" | "PA" => Region::Northeast,
        "IL" | "IN" | "MI" | "OH" | "WI" | "IA" | "KS" | "MN" | "MO" | "NE" | "ND" | "SD" => {
            Region::Midwest
        }
        "DE" | "FL" | "GA" | "MD" | "NC" | "SC" | "VA" | "DC" | "WV" | "AL" | "KY" | "MS"
        | "TN" | "AR" | "LA" | "OK" | "TX" => Region::South,
        "AZ" | "CO" | "ID" | "MT" | "NV" | "NM" | "UT" | "WY" | "AK" | "CA" | "HI" | "OR"
        | "WA" => Region::West,
        _ => return None,
    };
    Some(region)
}

/// Restricted practice family of a credential, if any.
pub fn credential_family(credential: &str) -> Option<PracticeFamily> {
    match normalize_credential(credential).as_str() {
        "DDS" | "DMD" => Some(PracticeFamily::Dental),
        "DPM" => Some(PracticeFamily::Podiatry),
        "OD" => Some(PracticeFamily::Optometry),
        "DC" => Some(PracticeFamily::Chiropractic),
        _ => None,
    }
}

/// Restricted practice family a specialty belongs to, if any.
pub fn specialty_family(specialty: &str) -> Option<PracticeFamily> {
    let lower = specialty.to_lowercase();
    PracticeFamily::ALL
        .iter()
        .copied()
        .find(|family| family.keywords().iter().any(|k| lower.contains(k)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_code_lookup() {
        assert_eq!(area_code_state("617"), Some("MA"));
        assert_eq!(area_code_state("212"), Some("NY"));
        assert_eq!(area_code_state("999"), None);
    }

    #[test]
    fn test_phone_digits() {
        assert_eq!(phone_digits("(617) 555-0143"), Some("6175550143".to_string()));
        assert_eq!(phone_digits("+1 617-555-0143"), Some("6175550143".to_string()));
        assert_eq!(phone_digits("555-0143"), None);
    }

    #[test]
    fn test_zip_zone() {
        assert!(zip_zone_states("02115").unwrap().contains(&"MA"));
        assert!(!zip_zone_states("90210").unwrap().contains(&"MA"));
        assert!(zip_zone_states("").is_none());
    }

    #[test]
    fn test_regions() {
        assert_eq!(state_region("ma"), Some(Region::Northeast));
        assert_eq!(state_region("TX"), Some(Region::South));
        assert_eq!(state_region("PR"), None);
    }

    #[test]
    fn test_credential_families() {
        assert_eq!(credential_family("D.D.S."), Some(PracticeFamily::Dental));
        assert_eq!(credential_family("MD"), None);
        assert_eq!(specialty_family("Pediatric Dentistry"), Some(PracticeFamily::Dental));
        assert_eq!(specialty_family("Cardiology"), None);
        assert!(is_known_credential("m.d."));
        assert!(!is_known_credential("Wizard"));
    }
}
