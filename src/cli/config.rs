use colored::Colorize;

use crate::error::{FinmapError, Result};
use crate::settings::{load_settings, save_settings, settings_path, Settings};

#[derive(Default)]
pub struct ConfigUpdate {
    pub preview_rows: Option<usize>,
    pub default_sheet: Option<String>,
    pub output_dir: Option<String>,
    pub auto_map_on_load: Option<bool>,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.preview_rows.is_none()
            && self.default_sheet.is_none()
            && self.output_dir.is_none()
            && self.auto_map_on_load.is_none()
    }

    /// Apply the given fields. An empty `default_sheet` unsets it.
    fn apply(self, mut settings: Settings) -> Result<Settings> {
        if let Some(rows) = self.preview_rows {
            if rows == 0 {
                return Err(FinmapError::Settings(
                    "preview rows must be at least 1".into(),
                ));
            }
            settings.preview_rows = rows;
        }
        if let Some(sheet) = self.default_sheet {
            let sheet = sheet.trim();
            settings.default_sheet = (!sheet.is_empty()).then(|| sheet.to_string());
        }
        if let Some(dir) = self.output_dir {
            if dir.trim().is_empty() {
                return Err(FinmapError::Settings("output dir cannot be empty".into()));
            }
            settings.output_dir = dir;
        }
        if let Some(auto) = self.auto_map_on_load {
            settings.auto_map_on_load = auto;
        }
        Ok(settings)
    }
}

pub fn run(update: ConfigUpdate) -> Result<()> {
    let mut settings = load_settings();
    if !update.is_empty() {
        settings = update.apply(settings)?;
        save_settings(&settings)?;
        println!("{}", "Settings saved.".green());
    }

    println!("{}", settings_path().display().to_string().dimmed());
    println!("preview_rows:     {}", settings.preview_rows);
    println!(
        "default_sheet:    {}",
        settings.default_sheet.as_deref().unwrap_or("(first sheet)")
    );
    println!("output_dir:       {}", settings.output_dir);
    println!("auto_map_on_load: {}", settings.auto_map_on_load);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_updates_only_given_fields() {
        let update = ConfigUpdate {
            preview_rows: Some(25),
            auto_map_on_load: Some(true),
            ..Default::default()
        };
        let settings = update.apply(Settings::default()).unwrap();
        assert_eq!(settings.preview_rows, 25);
        assert!(settings.auto_map_on_load);
        assert_eq!(settings.output_dir, ".");
        assert_eq!(settings.default_sheet, None);
    }

    #[test]
    fn test_empty_default_sheet_unsets() {
        let start = Settings {
            default_sheet: Some("Model".into()),
            ..Settings::default()
        };
        let update = ConfigUpdate {
            default_sheet: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(update.apply(start).unwrap().default_sheet, None);
    }

    #[test]
    fn test_rejects_zero_preview_rows() {
        let update = ConfigUpdate {
            preview_rows: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            update.apply(Settings::default()),
            Err(FinmapError::Settings(_))
        ));
        assert!(ConfigUpdate::default().is_empty());
    }
}
