//! The static knowledge base backing both context enrichment and the
//! `search_company_info` tool. Built once at startup and shared by read-only
//! reference across request tasks; nothing here is ever mutated after load.

use serde::Serialize;

pub const NO_MATCH: &str = "No relevant information found in knowledge base.";

#[derive(Debug, Clone, Serialize)]
pub struct CompanyInfo {
    pub name: String,
    pub founded: String,
    pub mission: String,
    pub products: Vec<String>,
    pub support_hours: String,
    pub return_policy: String,
}

impl CompanyInfo {
    /// Entries as (key, stringified value) pairs, in declaration order.
    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("founded", self.founded.clone()),
            ("mission", self.mission.clone()),
            ("products", self.products.join(", ")),
            ("support_hours", self.support_hours.clone()),
            ("return_policy", self.return_policy.clone()),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Faq {
    pub shipping: String,
    pub payment: String,
    pub support: String,
    pub warranty: String,
}

impl Faq {
    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("shipping", &self.shipping),
            ("payment", &self.payment),
            ("support", &self.support),
            ("warranty", &self.warranty),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    pub temp: i32,
    pub condition: String,
    pub humidity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBase {
    pub company: CompanyInfo,
    pub faq: Faq,
    weather: Vec<(String, WeatherRecord)>,
}

impl KnowledgeBase {
    /// The built-in ACME dataset.
    pub fn builtin() -> Self {
        let record = |temp, condition: &str, humidity| WeatherRecord {
            temp,
            condition: condition.to_string(),
            humidity,
        };

        Self {
            company: CompanyInfo {
                name: "ACME Corporation".to_string(),
                founded: "2020".to_string(),
                mission: "To provide innovative AI solutions for businesses".to_string(),
                products: vec![
                    "AI Chatbots".to_string(),
                    "Voice Assistants".to_string(),
                    "Computer Vision".to_string(),
                ],
                support_hours: "24/7".to_string(),
                return_policy: "30 days money back guarantee".to_string(),
            },
            faq: Faq {
                shipping: "Free shipping on orders over $50. Standard delivery 3-5 business days."
                    .to_string(),
                payment: "We accept all major credit cards, PayPal, and bank transfers."
                    .to_string(),
                support: "Contact us at support@acme.com or call 1-800-ACME-HELP".to_string(),
                warranty: "All products come with 1-year warranty and lifetime support."
                    .to_string(),
            },
            weather: vec![
                ("new_york".to_string(), record(22, "Sunny", 60)),
                ("london".to_string(), record(15, "Rainy", 85)),
                ("tokyo".to_string(), record(25, "Cloudy", 70)),
                ("san_francisco".to_string(), record(18, "Foggy", 90)),
            ],
        }
    }

    /// Case-insensitive lookup over the company and FAQ sections. A company
    /// entry matches when its key or its stringified value appears in the
    /// query; an FAQ entry matches when its topic or any word of its answer
    /// appears in the query. No ranking, pure substring membership.
    pub fn lookup(&self, query: &str) -> String {
        let query = query.to_lowercase();
        let mut lines = Vec::new();

        for (key, value) in self.company.entries() {
            if query.contains(key) || query.contains(&value.to_lowercase()) {
                lines.push(format!("{key}: {value}"));
            }
        }

        for (topic, answer) in self.faq.entries() {
            let answer_lower = answer.to_lowercase();
            if query.contains(topic)
                || answer_lower
                    .split_whitespace()
                    .any(|word| query.contains(word))
            {
                lines.push(format!("{topic}: {answer}"));
            }
        }

        if lines.is_empty() {
            NO_MATCH.to_string()
        } else {
            lines.join("\n")
        }
    }

    pub fn weather(&self, key: &str) -> Option<&WeatherRecord> {
        self.weather
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, record)| record)
    }

    /// Known location keys, in declaration order.
    pub fn weather_keys(&self) -> Vec<&str> {
        self.weather.iter().map(|(name, _)| name.as_str()).collect()
    }
}
