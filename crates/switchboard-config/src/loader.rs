use std::collections::HashSet;
use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing
    /// fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if a tenant has no backends, duplicate backend
    /// ids, or a multi-model section referencing unknown entries
    pub fn validate(&self) -> anyhow::Result<()> {
        for (tenant, tenant_config) in &self.tenants {
            if tenant_config.backends.is_empty() {
                anyhow::bail!("tenant '{tenant}' has no backends configured");
            }

            let mut seen = HashSet::new();
            for backend in &tenant_config.backends {
                if !seen.insert(backend.id.as_str()) {
                    anyhow::bail!("tenant '{tenant}' has duplicate backend id '{}'", backend.id);
                }
            }

            if let Some(ref multi_model) = tenant_config.multi_model {
                if !seen.contains(multi_model.backend_id.as_str()) {
                    anyhow::bail!(
                        "tenant '{tenant}' multi_model.backend_id '{}' is not a configured backend",
                        multi_model.backend_id
                    );
                }
                if multi_model.fallback_models.contains(&multi_model.primary_model) {
                    anyhow::bail!(
                        "tenant '{tenant}' lists primary model '{}' among its fallbacks",
                        multi_model.primary_model
                    );
                }
            }
        }

        Ok(())
    }
}
