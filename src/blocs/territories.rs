// Resolution of voter display names to 3-letter territory codes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bumped whenever an entry of `BUILTIN_OVERRIDES` changes.
pub const OVERRIDE_TABLE_VERSION: u32 = 1;

/// Names that are not found in the registry but contain one of these fragments get
/// the associated code. The first matching fragment wins.
const BUILTIN_OVERRIDES: &[(&str, &str)] = &[
    ("Korea, Republic of", "KOR"),
    ("United States", "USA"),
    ("United Kingdom", "GBR"),
    ("Russia", "RUS"),
    ("Iran", "IRN"),
    ("Vietnam", "VNM"),
    ("Bolivia", "BOL"),
    ("Venezuela", "VEN"),
    ("Tanzania", "TZA"),
    ("Syrian", "SYR"),
];

/// ISO 3166-1 codes with their short names.
const TERRITORIES: &[(&str, &str)] = &[
    ("AFG", "Afghanistan"),
    ("ALA", "Åland Islands"),
    ("ALB", "Albania"),
    ("DZA", "Algeria"),
    ("ASM", "American Samoa"),
    ("AND", "Andorra"),
    ("AGO", "Angola"),
    ("AIA", "Anguilla"),
    ("ATA", "Antarctica"),
    ("ATG", "Antigua and Barbuda"),
    ("ARG", "Argentina"),
    ("ARM", "Armenia"),
    ("ABW", "Aruba"),
    ("AUS", "Australia"),
    ("AUT", "Austria"),
    ("AZE", "Azerbaijan"),
    ("BHS", "Bahamas"),
    ("BHR", "Bahrain"),
    ("BGD", "Bangladesh"),
    ("BRB", "Barbados"),
    ("BLR", "Belarus"),
    ("BEL", "Belgium"),
    ("BLZ", "Belize"),
    ("BEN", "Benin"),
    ("BMU", "Bermuda"),
    ("BTN", "Bhutan"),
    ("BOL", "Bolivia, Plurinational State of"),
    ("BES", "Bonaire, Sint Eustatius and Saba"),
    ("BIH", "Bosnia and Herzegovina"),
    ("BWA", "Botswana"),
    ("BVT", "Bouvet Island"),
    ("BRA", "Brazil"),
    ("IOT", "British Indian Ocean Territory"),
    ("BRN", "Brunei Darussalam"),
    ("BGR", "Bulgaria"),
    ("BFA", "Burkina Faso"),
    ("BDI", "Burundi"),
    ("CPV", "Cabo Verde"),
    ("KHM", "Cambodia"),
    ("CMR", "Cameroon"),
    ("CAN", "Canada"),
    ("CYM", "Cayman Islands"),
    ("CAF", "Central African Republic"),
    ("TCD", "Chad"),
    ("CHL", "Chile"),
    ("CHN", "China"),
    ("CXR", "Christmas Island"),
    ("CCK", "Cocos (Keeling) Islands"),
    ("COL", "Colombia"),
    ("COM", "Comoros"),
    ("COG", "Congo"),
    ("COD", "Congo, The Democratic Republic of the"),
    ("COK", "Cook Islands"),
    ("CRI", "Costa Rica"),
    ("CIV", "Côte d'Ivoire"),
    ("HRV", "Croatia"),
    ("CUB", "Cuba"),
    ("CUW", "Curaçao"),
    ("CYP", "Cyprus"),
    ("CZE", "Czechia"),
    ("DNK", "Denmark"),
    ("DJI", "Djibouti"),
    ("DMA", "Dominica"),
    ("DOM", "Dominican Republic"),
    ("ECU", "Ecuador"),
    ("EGY", "Egypt"),
    ("SLV", "El Salvador"),
    ("GNQ", "Equatorial Guinea"),
    ("ERI", "Eritrea"),
    ("EST", "Estonia"),
    ("SWZ", "Eswatini"),
    ("ETH", "Ethiopia"),
    ("FLK", "Falkland Islands (Malvinas)"),
    ("FRO", "Faroe Islands"),
    ("FJI", "Fiji"),
    ("FIN", "Finland"),
    ("FRA", "France"),
    ("GUF", "French Guiana"),
    ("PYF", "French Polynesia"),
    ("ATF", "French Southern Territories"),
    ("GAB", "Gabon"),
    ("GMB", "Gambia"),
    ("GEO", "Georgia"),
    ("DEU", "Germany"),
    ("GHA", "Ghana"),
    ("GIB", "Gibraltar"),
    ("GRC", "Greece"),
    ("GRL", "Greenland"),
    ("GRD", "Grenada"),
    ("GLP", "Guadeloupe"),
    ("GUM", "Guam"),
    ("GTM", "Guatemala"),
    ("GGY", "Guernsey"),
    ("GIN", "Guinea"),
    ("GNB", "Guinea-Bissau"),
    ("GUY", "Guyana"),
    ("HTI", "Haiti"),
    ("HMD", "Heard Island and McDonald Islands"),
    ("VAT", "Holy See (Vatican City State)"),
    ("HND", "Honduras"),
    ("HKG", "Hong Kong"),
    ("HUN", "Hungary"),
    ("ISL", "Iceland"),
    ("IND", "India"),
    ("IDN", "Indonesia"),
    ("IRN", "Iran, Islamic Republic of"),
    ("IRQ", "Iraq"),
    ("IRL", "Ireland"),
    ("IMN", "Isle of Man"),
    ("ISR", "Israel"),
    ("ITA", "Italy"),
    ("JAM", "Jamaica"),
    ("JPN", "Japan"),
    ("JEY", "Jersey"),
    ("JOR", "Jordan"),
    ("KAZ", "Kazakhstan"),
    ("KEN", "Kenya"),
    ("KIR", "Kiribati"),
    ("PRK", "Korea, Democratic People's Republic of"),
    ("KOR", "Korea, Republic of"),
    ("KWT", "Kuwait"),
    ("KGZ", "Kyrgyzstan"),
    ("LAO", "Lao People's Democratic Republic"),
    ("LVA", "Latvia"),
    ("LBN", "Lebanon"),
    ("LSO", "Lesotho"),
    ("LBR", "Liberia"),
    ("LBY", "Libya"),
    ("LIE", "Liechtenstein"),
    ("LTU", "Lithuania"),
    ("LUX", "Luxembourg"),
    ("MAC", "Macao"),
    ("MDG", "Madagascar"),
    ("MWI", "Malawi"),
    ("MYS", "Malaysia"),
    ("MDV", "Maldives"),
    ("MLI", "Mali"),
    ("MLT", "Malta"),
    ("MHL", "Marshall Islands"),
    ("MTQ", "Martinique"),
    ("MRT", "Mauritania"),
    ("MUS", "Mauritius"),
    ("MYT", "Mayotte"),
    ("MEX", "Mexico"),
    ("FSM", "Micronesia, Federated States of"),
    ("MDA", "Moldova, Republic of"),
    ("MCO", "Monaco"),
    ("MNG", "Mongolia"),
    ("MNE", "Montenegro"),
    ("MSR", "Montserrat"),
    ("MAR", "Morocco"),
    ("MOZ", "Mozambique"),
    ("MMR", "Myanmar"),
    ("NAM", "Namibia"),
    ("NRU", "Nauru"),
    ("NPL", "Nepal"),
    ("NLD", "Netherlands"),
    ("NCL", "New Caledonia"),
    ("NZL", "New Zealand"),
    ("NIC", "Nicaragua"),
    ("NER", "Niger"),
    ("NGA", "Nigeria"),
    ("NIU", "Niue"),
    ("NFK", "Norfolk Island"),
    ("MKD", "North Macedonia"),
    ("MNP", "Northern Mariana Islands"),
    ("NOR", "Norway"),
    ("OMN", "Oman"),
    ("PAK", "Pakistan"),
    ("PLW", "Palau"),
    ("PSE", "Palestine, State of"),
    ("PAN", "Panama"),
    ("PNG", "Papua New Guinea"),
    ("PRY", "Paraguay"),
    ("PER", "Peru"),
    ("PHL", "Philippines"),
    ("PCN", "Pitcairn"),
    ("POL", "Poland"),
    ("PRT", "Portugal"),
    ("PRI", "Puerto Rico"),
    ("QAT", "Qatar"),
    ("REU", "Réunion"),
    ("ROU", "Romania"),
    ("RUS", "Russian Federation"),
    ("RWA", "Rwanda"),
    ("BLM", "Saint Barthélemy"),
    ("SHN", "Saint Helena, Ascension and Tristan da Cunha"),
    ("KNA", "Saint Kitts and Nevis"),
    ("LCA", "Saint Lucia"),
    ("MAF", "Saint Martin (French part)"),
    ("SPM", "Saint Pierre and Miquelon"),
    ("VCT", "Saint Vincent and the Grenadines"),
    ("WSM", "Samoa"),
    ("SMR", "San Marino"),
    ("STP", "Sao Tome and Principe"),
    ("SAU", "Saudi Arabia"),
    ("SEN", "Senegal"),
    ("SRB", "Serbia"),
    ("SYC", "Seychelles"),
    ("SLE", "Sierra Leone"),
    ("SGP", "Singapore"),
    ("SXM", "Sint Maarten (Dutch part)"),
    ("SVK", "Slovakia"),
    ("SVN", "Slovenia"),
    ("SLB", "Solomon Islands"),
    ("SOM", "Somalia"),
    ("ZAF", "South Africa"),
    ("SGS", "South Georgia and the South Sandwich Islands"),
    ("SSD", "South Sudan"),
    ("ESP", "Spain"),
    ("LKA", "Sri Lanka"),
    ("SDN", "Sudan"),
    ("SUR", "Suriname"),
    ("SJM", "Svalbard and Jan Mayen"),
    ("SWE", "Sweden"),
    ("CHE", "Switzerland"),
    ("SYR", "Syrian Arab Republic"),
    ("TWN", "Taiwan, Province of China"),
    ("TJK", "Tajikistan"),
    ("TZA", "Tanzania, United Republic of"),
    ("THA", "Thailand"),
    ("TLS", "Timor-Leste"),
    ("TGO", "Togo"),
    ("TKL", "Tokelau"),
    ("TON", "Tonga"),
    ("TTO", "Trinidad and Tobago"),
    ("TUN", "Tunisia"),
    ("TUR", "Türkiye"),
    ("TKM", "Turkmenistan"),
    ("TCA", "Turks and Caicos Islands"),
    ("TUV", "Tuvalu"),
    ("UGA", "Uganda"),
    ("UKR", "Ukraine"),
    ("ARE", "United Arab Emirates"),
    ("GBR", "United Kingdom"),
    ("USA", "United States"),
    ("UMI", "United States Minor Outlying Islands"),
    ("URY", "Uruguay"),
    ("UZB", "Uzbekistan"),
    ("VUT", "Vanuatu"),
    ("VEN", "Venezuela, Bolivarian Republic of"),
    ("VNM", "Viet Nam"),
    ("VGB", "Virgin Islands, British"),
    ("VIR", "Virgin Islands, U.S."),
    ("WLF", "Wallis and Futuna"),
    ("ESH", "Western Sahara"),
    ("YEM", "Yemen"),
    ("ZMB", "Zambia"),
    ("ZWE", "Zimbabwe"),
];

/// An extra entry of the override table, as found in the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NameOverride {
    pub fragment: String,
    pub code: String,
}

pub fn is_known_code(code: &str) -> bool {
    TERRITORIES.iter().any(|(c, _)| *c == code)
}

/// Maps display names to codes.
///
/// The name is first looked up in the registry (exact match, ignoring case), then
/// in the override table. Names found in neither are not resolved.
pub struct VoterResolver {
    by_name: HashMap<String, &'static str>,
    overrides: Vec<(String, String)>,
}

impl VoterResolver {
    /// Builds a resolver with the built-in overrides followed by `extra`.
    pub fn new(extra: &[NameOverride]) -> VoterResolver {
        let by_name = TERRITORIES
            .iter()
            .map(|(code, name)| (name.to_lowercase(), *code))
            .collect();
        let mut overrides: Vec<(String, String)> = BUILTIN_OVERRIDES
            .iter()
            .map(|(f, c)| (f.to_string(), c.to_string()))
            .collect();
        overrides.extend(extra.iter().map(|o| (o.fragment.clone(), o.code.clone())));
        VoterResolver { by_name, overrides }
    }

    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(code) = self.by_name.get(&name.to_lowercase()) {
            return Some(code.to_string());
        }
        self.overrides
            .iter()
            .find(|(fragment, _)| name.contains(fragment.as_str()))
            .map(|(_, code)| code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names() {
        let r = VoterResolver::new(&[]);
        assert_eq!(r.resolve("United States"), Some("USA".to_string()));
        assert_eq!(r.resolve("france"), Some("FRA".to_string()));
        assert_eq!(r.resolve("Viet Nam"), Some("VNM".to_string()));
        assert_eq!(
            r.resolve("Korea, Democratic People's Republic of"),
            Some("PRK".to_string())
        );
    }

    #[test]
    fn override_fragments() {
        let r = VoterResolver::new(&[]);
        assert_eq!(r.resolve("United States of America"), Some("USA".to_string()));
        assert_eq!(r.resolve("Korea, Republic of (South)"), Some("KOR".to_string()));
        assert_eq!(
            r.resolve("United Kingdom of Great Britain"),
            Some("GBR".to_string())
        );
        assert_eq!(r.resolve("Russia"), Some("RUS".to_string()));
        assert_eq!(r.resolve("Iran (Islamic Republic of)"), Some("IRN".to_string()));
        assert_eq!(r.resolve("Vietnam"), Some("VNM".to_string()));
        assert_eq!(r.resolve("Bolivia"), Some("BOL".to_string()));
        assert_eq!(r.resolve("Venezuela"), Some("VEN".to_string()));
        assert_eq!(
            r.resolve("United Republic of Tanzania"),
            Some("TZA".to_string())
        );
        assert_eq!(r.resolve("Syrian Arab Rep."), Some("SYR".to_string()));
    }

    #[test]
    fn unknown_names_are_not_resolved() {
        let r = VoterResolver::new(&[]);
        assert_eq!(r.resolve("Yugoslavia"), None);
        assert_eq!(r.resolve(""), None);
        assert_eq!(r.resolve("Atlantis"), None);
    }

    #[test]
    fn extra_overrides_come_last() {
        let r = VoterResolver::new(&[
            NameOverride {
                fragment: "Yugoslavia".to_string(),
                code: "SRB".to_string(),
            },
            NameOverride {
                fragment: "United".to_string(),
                code: "ARE".to_string(),
            },
        ]);
        assert_eq!(
            r.resolve("Socialist Federal Republic of Yugoslavia"),
            Some("SRB".to_string())
        );
        assert_eq!(r.resolve("United States of America"), Some("USA".to_string()));
        assert_eq!(r.resolve("United Arab Emirates"), Some("ARE".to_string()));
    }

    #[test]
    fn every_override_points_to_a_known_code() {
        for (_, code) in BUILTIN_OVERRIDES {
            assert!(is_known_code(code));
        }
        assert_eq!(TERRITORIES.len(), 249);
        assert!(!is_known_code("SUN"));
    }
}
