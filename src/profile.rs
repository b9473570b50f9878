use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Candidate data used to fill contact fields and to brief the answer provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin_url: String,
    pub location: String,
    /// Free-text background shown to the answer provider.
    pub summary: String,
    pub skills: Vec<String>,
}

impl CandidateProfile {
    /// Load a profile from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Short background block for prompts.
    pub fn background(&self) -> String {
        let mut out = format!("Candidate: {}", self.full_name());
        if !self.location.is_empty() {
            out.push_str(&format!("\nLocation: {}", self.location));
        }
        if !self.summary.is_empty() {
            out.push_str(&format!("\nBackground: {}", self.summary));
        }
        if !self.skills.is_empty() {
            out.push_str(&format!("\nSkills: {}", self.skills.join(", ")));
        }
        out
    }
}
