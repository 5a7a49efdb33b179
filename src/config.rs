use crate::error::{ControllingError, Result};
use crate::schema::SourceKind;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one controlling run. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ControllingConfig {
    #[schemars(description = "Path of the SAP project master data export (Stammdaten HHP)")]
    pub csv_stammdaten: String,
    #[schemars(description = "Verify the content marker of the master data export")]
    pub check_stammdaten: bool,
    #[schemars(description = "Number of header lines to skip in the master data export")]
    pub header_stammdaten: usize,

    #[schemars(description = "Path of the SAP budget export")]
    pub csv_budget: String,
    pub check_budget: bool,
    pub header_budget: usize,

    #[schemars(description = "Path of the SAP obligo (commitments) export")]
    pub csv_obligo: String,
    pub check_obligo: bool,
    pub header_obligo: usize,

    #[schemars(description = "Path of the SAP account turnover export (Kontostand)")]
    pub csv_kst: String,
    pub check_kst: bool,
    pub header_kst: usize,

    #[schemars(
        description = "Project types reported in three slices: collective accounts, individual accounts ending before the cutoff, individual accounts ending after it"
    )]
    pub liste_pa_aufteilung: Vec<u8>,

    #[schemars(description = "Project types reported as one slice over all accounts")]
    pub liste_pa_keine_aufteilung: Vec<u8>,

    #[schemars(
        description = "Optional list of project identifiers that get their own, unsummarized detail section"
    )]
    pub csv_detailplot: String,

    #[schemars(description = "Drop projects whose status contains 'beendet'")]
    pub rm_beendet: bool,

    #[schemars(description = "Drop the newest year, which is usually still incomplete")]
    pub rm_current_year: bool,

    #[schemars(description = "Also write the consolidated raw records as CSV")]
    pub prt_raw: bool,

    #[schemars(
        description = "Add +-25% noise to all amounts and mask identifiers; for producing shareable fixtures"
    )]
    pub obfuscated: bool,
}

impl Default for ControllingConfig {
    fn default() -> Self {
        Self {
            csv_stammdaten: "input/WPS_PSP_STAMMDATEN_V1.csv".to_string(),
            check_stammdaten: true,
            header_stammdaten: 3,
            csv_budget: "input/WFI_001_FC_BUDGET_V1.csv".to_string(),
            check_budget: true,
            header_budget: 4,
            csv_obligo: "input/WFI_001_FC_OBLIGOS_V1.csv".to_string(),
            check_obligo: true,
            header_obligo: 4,
            csv_kst: "input/WPSM_004_KSD.csv".to_string(),
            check_kst: true,
            header_kst: 4,
            liste_pa_aufteilung: vec![68, 69, 90, 91, 92, 99],
            liste_pa_keine_aufteilung: vec![70, 94],
            csv_detailplot: "input/PSP_PLOT.csv".to_string(),
            rm_beendet: true,
            rm_current_year: true,
            prt_raw: false,
            obfuscated: false,
        }
    }
}

impl ControllingConfig {
    /// Reads the config from `path` if it exists, otherwise returns the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for code in self
            .liste_pa_aufteilung
            .iter()
            .chain(self.liste_pa_keine_aufteilung.iter())
        {
            if *code > 99 {
                return Err(ControllingError::InvalidConfig(format!(
                    "project type {} is not a two digit code",
                    code
                )));
            }
        }
        Ok(())
    }

    pub fn source_path(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Master => &self.csv_stammdaten,
            SourceKind::Budget => &self.csv_budget,
            SourceKind::Obligo => &self.csv_obligo,
            SourceKind::Turnover => &self.csv_kst,
        }
    }

    pub fn header_rows(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::Master => self.header_stammdaten,
            SourceKind::Budget => self.header_budget,
            SourceKind::Obligo => self.header_obligo,
            SourceKind::Turnover => self.header_kst,
        }
    }

    pub fn check_marker(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Master => self.check_stammdaten,
            SourceKind::Budget => self.check_budget,
            SourceKind::Obligo => self.check_obligo,
            SourceKind::Turnover => self.check_kst,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ControllingConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
