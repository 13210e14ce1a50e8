//! The fixed set of Iranian cities the service books between.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum City {
    Tehran,
    Mashhad,
    Isfahan,
    Shiraz,
    Tabriz,
    Yazd,
    Kerman,
    Kashan,
    Qom,
    Ahvaz,
    Bushehr,
    BandarAbbas,
    Kish,
    Qeshm,
    Rasht,
    Sari,
    Gorgan,
    Ardabil,
    Urmia,
    Hamadan,
    Kermanshah,
    Zahedan,
}

impl City {
    pub const ALL: [City; 22] = [
        City::Tehran,
        City::Mashhad,
        City::Isfahan,
        City::Shiraz,
        City::Tabriz,
        City::Yazd,
        City::Kerman,
        City::Kashan,
        City::Qom,
        City::Ahvaz,
        City::Bushehr,
        City::BandarAbbas,
        City::Kish,
        City::Qeshm,
        City::Rasht,
        City::Sari,
        City::Gorgan,
        City::Ardabil,
        City::Urmia,
        City::Hamadan,
        City::Kermanshah,
        City::Zahedan,
    ];

    pub fn english_name(&self) -> &'static str {
        match self {
            City::Tehran => "Tehran",
            City::Mashhad => "Mashhad",
            City::Isfahan => "Isfahan",
            City::Shiraz => "Shiraz",
            City::Tabriz => "Tabriz",
            City::Yazd => "Yazd",
            City::Kerman => "Kerman",
            City::Kashan => "Kashan",
            City::Qom => "Qom",
            City::Ahvaz => "Ahvaz",
            City::Bushehr => "Bushehr",
            City::BandarAbbas => "Bandar Abbas",
            City::Kish => "Kish",
            City::Qeshm => "Qeshm",
            City::Rasht => "Rasht",
            City::Sari => "Sari",
            City::Gorgan => "Gorgan",
            City::Ardabil => "Ardabil",
            City::Urmia => "Urmia",
            City::Hamadan => "Hamadan",
            City::Kermanshah => "Kermanshah",
            City::Zahedan => "Zahedan",
        }
    }

    pub fn persian_name(&self) -> &'static str {
        match self {
            City::Tehran => "تهران",
            City::Mashhad => "مشهد",
            City::Isfahan => "اصفهان",
            City::Shiraz => "شیراز",
            City::Tabriz => "تبریز",
            City::Yazd => "یزد",
            City::Kerman => "کرمان",
            City::Kashan => "کاشان",
            City::Qom => "قم",
            City::Ahvaz => "اهواز",
            City::Bushehr => "بوشهر",
            City::BandarAbbas => "بندرعباس",
            City::Kish => "کیش",
            City::Qeshm => "قشم",
            City::Rasht => "رشت",
            City::Sari => "ساری",
            City::Gorgan => "گرگان",
            City::Ardabil => "اردبیل",
            City::Urmia => "ارومیه",
            City::Hamadan => "همدان",
            City::Kermanshah => "کرمانشاه",
            City::Zahedan => "زاهدان",
        }
    }

    /// Island destinations carry a fare surcharge.
    pub fn is_island(&self) -> bool {
        matches!(self, City::Kish | City::Qeshm)
    }

    /// Resolve a user- or model-supplied city name, in English or Persian.
    pub fn parse(input: &str) -> Option<City> {
        let key = normalize(input);
        if key.is_empty() {
            return None;
        }

        City::ALL.into_iter().find(|city| {
            normalize(city.english_name()) == key
                || normalize(city.persian_name()) == key
                || city.aliases().iter().any(|alias| normalize(alias) == key)
        })
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            City::Mashhad => &["Mashad"],
            City::Isfahan => &["Esfahan", "Ispahan"],
            City::Ahvaz => &["Ahwaz"],
            City::BandarAbbas => &["Bandar-e Abbas", "بندر عباس"],
            City::Kish => &["Kish Island", "جزیره کیش"],
            City::Qeshm => &["Qeshm Island", "Gheshm", "جزیره قشم"],
            City::Urmia => &["Orumiyeh", "Urumieh"],
            City::Hamadan => &["Hamedan"],
            _ => &[],
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.english_name(), self.persian_name())
    }
}

/// Case-fold, drop separators and unify Arabic/Persian letter variants.
fn normalize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.' | '\u{200C}'))
        .map(|c| match c {
            'ي' => 'ی',
            'ك' => 'ک',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}
