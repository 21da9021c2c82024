// Where the analysis reads its inputs and writes its report.
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "reports";

/// File locations for one analysis run. Source paths are relative to
/// `data_root`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub data_root: PathBuf,
    pub output_dir: PathBuf,
    pub mapping_file: PathBuf,
    pub campaign_file: PathBuf,
    pub hourly_file: PathBuf,
    pub search_summary_file: PathBuf,
    pub search_daily_file: PathBuf,
    pub product_file: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_ROOT, DEFAULT_OUTPUT_DIR)
    }
}

impl AnalysisConfig {
    /// The standard export layout under `data_root`.
    pub fn new(data_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            output_dir: output_dir.into(),
            mapping_file: Path::new("mappings").join("MSKUS_to_SKU_Amazon.xlsx"),
            campaign_file: Path::new("campaign_reports")
                .join("Sponsored_Products_Campaign_report_-_01-02_-15-03.xlsx"),
            hourly_file: Path::new("campaign_reports")
                .join("Sponsored_Products_Campaign_report-_hourly_(18th_to_2nd_march).csv"),
            search_summary_file: Path::new("search_terms")
                .join("Sponsored_Products_Search_Term_Impression_Share_report - summary.csv"),
            search_daily_file: Path::new("search_terms")
                .join("Sponsored_Products_Search_Term_Impression_Share_report_-Daily.csv"),
            product_file: Path::new("products")
                .join("Sponsored_Products_Advertised_product_report - SUMMARY.xlsx"),
        }
    }

    pub fn source(&self, relative: &Path) -> PathBuf {
        self.data_root.join(relative)
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.source(&self.mapping_file)
    }

    pub fn campaign_path(&self) -> PathBuf {
        self.source(&self.campaign_file)
    }

    pub fn hourly_path(&self) -> PathBuf {
        self.source(&self.hourly_file)
    }

    pub fn search_summary_path(&self) -> PathBuf {
        self.source(&self.search_summary_file)
    }

    pub fn search_daily_path(&self) -> PathBuf {
        self.source(&self.search_daily_file)
    }

    pub fn product_path(&self) -> PathBuf {
        self.source(&self.product_file)
    }

    /// Output workbook path stamped with `generated_at`.
    pub fn report_path(&self, generated_at: NaiveDateTime) -> PathBuf {
        self.output_dir.join(format!(
            "campaign_analysis_{}.xlsx",
            generated_at.format("%Y%m%d_%H%M%S")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_layout_lives_under_data() {
        let cfg = AnalysisConfig::default();
        assert_eq!(
            cfg.mapping_path(),
            Path::new("data/mappings/MSKUS_to_SKU_Amazon.xlsx")
        );
        assert!(cfg.hourly_path().starts_with("data/campaign_reports"));
        assert!(cfg.search_daily_path().starts_with("data/search_terms"));
        assert_eq!(cfg.output_dir, PathBuf::from("reports"));
    }

    #[test]
    fn report_path_is_timestamped() {
        let cfg = AnalysisConfig::new("/tmp/in", "/tmp/out");
        let at = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(
            cfg.report_path(at),
            PathBuf::from("/tmp/out/campaign_analysis_20240315_090507.xlsx")
        );
    }
}
