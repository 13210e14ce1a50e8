//! Fixed catalog of domestic destinations and preference matching.
//!
//! Suggestions only ever come from this table, so the agent cannot name a
//! city the service does not know about.

use safar_types::city::City;
use serde::Serialize;

pub const DEFAULT_SHORTLIST: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Weather,
    Interest,
    Style,
}

/// One matchable characteristic of a destination.
#[derive(Debug, Clone, Copy)]
pub struct Trait {
    pub facet: Facet,
    pub label: &'static str,
    /// English and Persian stems; four or more characters match as prefixes
    pub keywords: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct Destination {
    pub city: City,
    pub summary: &'static str,
    pub attractions: &'static [&'static str],
    pub traits: Vec<Trait>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub city_en: &'static str,
    pub city_fa: &'static str,
    pub score: usize,
    pub matched: Vec<MatchedTrait>,
    pub summary: &'static str,
    pub attractions: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedTrait {
    pub facet: Facet,
    pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct DestinationCatalog {
    entries: Vec<Destination>,
}

impl DestinationCatalog {
    pub fn new(entries: Vec<Destination>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Destination] {
        &self.entries
    }

    /// Rank catalog entries against free-text preferences.
    ///
    /// Score is the number of distinct traits hit. Entries with no hits are
    /// dropped; ties keep catalog order.
    pub fn suggest(&self, preferences: &str, limit: usize) -> Vec<Suggestion> {
        let tokens = tokenize(preferences);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<Suggestion> = self
            .entries
            .iter()
            .filter_map(|dest| {
                let matched: Vec<MatchedTrait> = dest
                    .traits
                    .iter()
                    .filter(|t| t.keywords.iter().any(|kw| tokens.iter().any(|tok| keyword_matches(kw, tok))))
                    .map(|t| MatchedTrait { facet: t.facet, label: t.label })
                    .collect();

                (!matched.is_empty()).then(|| Suggestion {
                    city_en: dest.city.english_name(),
                    city_fa: dest.city.persian_name(),
                    score: matched.len(),
                    matched,
                    summary: dest.summary,
                    attractions: dest.attractions.to_vec(),
                })
            })
            .collect();

        // stable: equal scores stay in catalog order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }
}

impl Default for DestinationCatalog {
    fn default() -> Self {
        Self::new(builtin_destinations())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('ي', "ی").replace('ك', "ک"))
        .collect()
}

fn keyword_matches(keyword: &str, token: &str) -> bool {
    token == keyword || (keyword.chars().count() >= 4 && token.starts_with(keyword))
}

const fn weather(label: &'static str, keywords: &'static [&'static str]) -> Trait {
    Trait { facet: Facet::Weather, label, keywords }
}

const fn interest(label: &'static str, keywords: &'static [&'static str]) -> Trait {
    Trait { facet: Facet::Interest, label, keywords }
}

const fn style(label: &'static str, keywords: &'static [&'static str]) -> Trait {
    Trait { facet: Facet::Style, label, keywords }
}

const HISTORY: &[&str] = &["histor", "ancient", "heritage", "unesco", "تاریخ", "باستان", "میراث"];
const BEACH: &[&str] = &["beach", "sea", "swim", "island", "coast", "ساحل", "دریا", "شنا", "جزیره"];
const WARM_WINTER: &[&str] = &["warm", "hot", "winter", "sunny", "گرم", "زمستان", "آفتاب"];
const COOL_SUMMER: &[&str] = &["cool", "cold", "summer", "خنک", "سرد", "تابستان"];
const SPRING: &[&str] = &["spring", "mild", "بهار", "معتدل"];
const DESERT: &[&str] = &["desert", "dune", "stars", "camel", "کویر", "بیابان", "ستاره", "شتر"];
const FAMILY: &[&str] = &["family", "kids", "children", "خانواده", "بچه", "کودک"];
const ADVENTURE: &[&str] = &["adventure", "hiking", "hike", "trek", "camping", "ماجراجو", "کوهنورد", "کمپ"];
const RELAX: &[&str] = &["relax", "rest", "calm", "quiet", "luxury", "honeymoon", "استراحت", "آرام", "لوکس"];
const BUDGET: &[&str] = &["budget", "cheap", "affordable", "اقتصادی", "ارزان"];
const SHOPPING: &[&str] = &["shop", "shopping", "mall", "bazaar", "market", "خرید", "بازار"];
const FOOD: &[&str] = &["food", "cuisine", "culinary", "eat", "غذا", "خوراک", "آشپزی"];
const NATURE: &[&str] = &["nature", "forest", "green", "rain", "mountain", "طبیعت", "جنگل", "سرسبز", "باران", "کوه"];
const SKI: &[&str] = &["ski", "skiing", "snow", "اسکی", "برف"];

fn builtin_destinations() -> Vec<Destination> {
    vec![
        Destination {
            city: City::Shiraz,
            summary: "City of poetry and gardens, gateway to Persepolis.",
            attractions: &["Persepolis (تخت جمشید)", "Tomb of Hafez (حافظیه)", "Eram Garden (باغ ارم)", "Nasir al-Mulk Mosque (مسجد نصیرالملک)"],
            traits: vec![
                interest("history", HISTORY),
                interest("poetry and gardens", &["poet", "poetry", "poem", "garden", "hafez", "saadi", "culture", "شعر", "باغ", "حافظ", "سعدی", "فرهنگ"]),
                weather("mild spring", SPRING),
                style("family", FAMILY),
            ],
        },
        Destination {
            city: City::Isfahan,
            summary: "Safavid capital with grand squares, bridges and crafts bazaars.",
            attractions: &["Naqsh-e Jahan Square (میدان نقش جهان)", "Si-o-se-pol Bridge (سی‌وسه‌پل)", "Vank Cathedral (کلیسای وانک)"],
            traits: vec![
                interest("history and architecture", &["histor", "architect", "mosque", "bridge", "unesco", "تاریخ", "معماری", "مسجد", "پل"]),
                interest("art and handicrafts", &["art", "craft", "handicraft", "هنر", "صنایع"]),
                style("shopping", SHOPPING),
                weather("mild spring", SPRING),
            ],
        },
        Destination {
            city: City::Yazd,
            summary: "Adobe desert city of windcatchers and Zoroastrian heritage.",
            attractions: &["Old City (بافت تاریخی)", "Amir Chakhmaq Complex (امیرچخماق)", "Fire Temple (آتشکده)"],
            traits: vec![
                interest("desert", DESERT),
                interest("history", &["histor", "ancient", "windcatcher", "zoroastrian", "unesco", "تاریخ", "بادگیر", "زرتشت"]),
                weather("warm and dry", &["warm", "hot", "dry", "گرم", "خشک"]),
                style("budget", BUDGET),
            ],
        },
        Destination {
            city: City::Kish,
            summary: "Resort island with beaches, diving and duty-free shopping.",
            attractions: &["Coral Beach (ساحل مرجانی)", "Greek Ship (کشتی یونانی)", "Kariz Underground City (شهر زیرزمینی کاریز)"],
            traits: vec![
                interest("beach and sea", BEACH),
                interest("diving", &["diving", "dive", "snorkel", "scuba", "coral", "غواصی", "مرجان"]),
                style("shopping", SHOPPING),
                style("relaxation", RELAX),
                weather("warm winter", WARM_WINTER),
            ],
        },
        Destination {
            city: City::Qeshm,
            summary: "Largest Persian Gulf island: geopark canyons and mangrove forests.",
            attractions: &["Chahkooh Canyon (دره چاهکوه)", "Hara Mangrove Forest (جنگل حرا)", "Namakdan Salt Cave (غار نمکدان)"],
            traits: vec![
                interest("nature and geology", &["nature", "geopark", "canyon", "mangrove", "geology", "طبیعت", "دره", "حرا", "ژئوپارک"]),
                interest("beach and sea", BEACH),
                style("adventure", ADVENTURE),
                weather("warm winter", WARM_WINTER),
            ],
        },
        Destination {
            city: City::Rasht,
            summary: "Green, rainy Gilan capital famous for its food.",
            attractions: &["Masuleh Village (ماسوله)", "Rasht Bazaar (بازار رشت)", "Saravan Forest Park (جنگل سراوان)"],
            traits: vec![
                interest("nature and forests", NATURE),
                interest("food", FOOD),
                weather("cool summer", COOL_SUMMER),
            ],
        },
        Destination {
            city: City::Mashhad,
            summary: "Pilgrimage city of the Imam Reza shrine.",
            attractions: &["Imam Reza Shrine (حرم امام رضا)", "Tomb of Ferdowsi (آرامگاه فردوسی)"],
            traits: vec![
                interest("pilgrimage", &["pilgrim", "pilgrimage", "shrine", "religio", "holy", "spiritual", "زیارت", "حرم", "مذهب", "معنوی"]),
                interest("poetry", &["ferdowsi", "shahnameh", "فردوسی", "شاهنامه"]),
                style("family", FAMILY),
            ],
        },
        Destination {
            city: City::Tabriz,
            summary: "Historic trade hub with one of the world's largest covered bazaars.",
            attractions: &["Tabriz Grand Bazaar (بازار تبریز)", "El Goli (ائل گلی)", "Kandovan Village (کندوان)"],
            traits: vec![
                style("shopping", SHOPPING),
                interest("history", HISTORY),
                weather("cool summer", COOL_SUMMER),
                interest("food", FOOD),
            ],
        },
        Destination {
            city: City::Kashan,
            summary: "Desert-edge town of historic mansions, gardens and rosewater.",
            attractions: &["Fin Garden (باغ فین)", "Tabatabaei House (خانه طباطبایی‌ها)", "Maranjab Desert (کویر مرنجاب)"],
            traits: vec![
                interest("historic houses and gardens", &["histor", "house", "mansion", "garden", "rose", "rosewater", "تاریخ", "خانه", "باغ", "گلاب"]),
                interest("desert", DESERT),
                weather("mild spring", SPRING),
            ],
        },
        Destination {
            city: City::Kerman,
            summary: "Base for the Lut Desert's kaluts and star-filled skies.",
            attractions: &["Lut Desert (کویر لوت)", "Ganjali Khan Complex (مجموعه گنجعلیخان)", "Shazdeh Garden (باغ شازده)"],
            traits: vec![
                interest("desert", &["desert", "lut", "kalut", "stars", "کویر", "لوت", "کلوت", "بیابان", "ستاره"]),
                style("adventure", ADVENTURE),
                interest("history", HISTORY),
            ],
        },
        Destination {
            city: City::Hamadan,
            summary: "One of the oldest cities in Iran, near the Ali Sadr water cave.",
            attractions: &["Ali Sadr Cave (غار علیصدر)", "Ganjnameh (گنجنامه)", "Avicenna Mausoleum (آرامگاه بوعلی)"],
            traits: vec![
                interest("caves and history", &["cave", "ancient", "histor", "غار", "تاریخ", "باستان"]),
                weather("cool summer", COOL_SUMMER),
                style("family", FAMILY),
            ],
        },
        Destination {
            city: City::Ardabil,
            summary: "Highland city of hot springs and the Sabalan mountain.",
            attractions: &["Sarein Hot Springs (آبگرم سرعین)", "Sheikh Safi Shrine (بقعه شیخ صفی)", "Alvares Ski Resort (پیست آلوارس)"],
            traits: vec![
                interest("hot springs", &["thermal", "spa", "sarein", "آبگرم", "سرعین"]),
                interest("skiing", SKI),
                weather("cool summer", COOL_SUMMER),
                style("relaxation", RELAX),
            ],
        },
        Destination {
            city: City::Tehran,
            summary: "The capital: museums, Alborz ski slopes and city life.",
            attractions: &["Golestan Palace (کاخ گلستان)", "Tochal (توچال)", "Dizin Ski Resort (پیست دیزین)"],
            traits: vec![
                interest("museums", &["museum", "palace", "modern", "city", "موزه", "کاخ"]),
                interest("skiing", SKI),
                style("shopping", SHOPPING),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beach_and_warm_winter_prefers_islands() {
        let catalog = DestinationCatalog::default();
        let picks = catalog.suggest("a warm beach for winter, maybe some diving", 3);
        assert_eq!(picks[0].city_en, "Kish");
        assert!(picks.iter().any(|s| s.city_en == "Qeshm"));
    }

    #[test]
    fn persian_preferences() {
        let catalog = DestinationCatalog::default();
        let picks = catalog.suggest("یک شهر گرم با آثار تاریخی زیاد", 3);
        assert!(!picks.is_empty());
        assert_eq!(picks[0].city_en, "Yazd");
    }

    #[test]
    fn skiing_in_persian() {
        let catalog = DestinationCatalog::default();
        let picks = catalog.suggest("مکانی برای اسکی", 3);
        let names: Vec<&str> = picks.iter().map(|s| s.city_en).collect();
        assert_eq!(names, vec!["Ardabil", "Tehran"]);
    }

    #[test]
    fn short_keywords_do_not_prefix_match() {
        // "season" must not hit the "sea" keyword
        let catalog = DestinationCatalog::default();
        assert!(catalog.suggest("any season works", 3).is_empty());
    }

    #[test]
    fn never_suggests_outside_catalog() {
        let catalog = DestinationCatalog::default();
        let known: Vec<&str> = catalog.entries().iter().map(|d| d.city.english_name()).collect();
        for prefs in ["history", "desert stars", "food and shopping", "Paris beaches", ""] {
            for s in catalog.suggest(prefs, 10) {
                assert!(known.contains(&s.city_en));
            }
        }
    }

    #[test]
    fn ranking_is_deterministic_and_limited() {
        let catalog = DestinationCatalog::default();
        let a = catalog.suggest("history", 3);
        let b = catalog.suggest("history", 3);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        // every history hit scores 1, so catalog order decides
        assert_eq!(a[0].city_en, "Shiraz");
        assert_eq!(a[1].city_en, "Isfahan");
    }

    #[test]
    fn builtin_catalog_has_traits_for_every_city() {
        let catalog = DestinationCatalog::default();
        assert_eq!(catalog.entries().len(), 13);
        for dest in catalog.entries() {
            assert!(!dest.traits.is_empty(), "{} has no traits", dest.city.english_name());
        }
    }

    #[test]
    fn custom_catalog_built_at_runtime() {
        let catalog = DestinationCatalog::new(vec![Destination {
            city: City::Rasht,
            summary: "rainy",
            attractions: &["Masuleh"],
            traits: vec![weather("rain", &["rain", "باران"]), style("budget", BUDGET)],
        }]);
        let picks = catalog.suggest("rain on a budget", 3);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].score, 2);
        assert_eq!(picks[0].city_en, "Rasht");
    }
}
