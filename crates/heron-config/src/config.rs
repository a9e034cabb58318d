//! Main configuration types.
//!
//! This module provides the top-level [`HeronConfig`] struct.

use heron_core::tables::{ConstraintTable, FactoryRule, FactoryTable, TypeTable};
use heron_core::{AnalysisTables, OutcomeKind};
use heron_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

use crate::{AnalysisConfig, ConfigError, LoggingConfig, TablesConfig};

/// Complete Heron configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use heron_config::HeronConfig;
///
/// let config = HeronConfig::default();
/// assert_eq!(config.analysis.arity_limit, 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HeronConfig {
    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Lookup table additions.
    #[serde(default)]
    pub tables: TablesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HeronConfig {
    /// Development preset: pretty, verbose logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ansi_enabled: true,
                include_location: true,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Json,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the arity limit is below 2 (a union needs success plus one error)
    /// - a worker count of zero is given
    /// - the log level is empty
    /// - a constraint, alias or factory name is empty
    /// - a factory names an unknown outcome kind
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.arity_limit < 2 {
            return Err(ConfigError::invalid_value(
                "analysis.arity_limit",
                format!("must be at least 2, got {}", self.analysis.arity_limit),
            ));
        }

        if self.analysis.workers == Some(0) {
            return Err(ConfigError::invalid_value(
                "analysis.workers",
                "must be at least 1",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }

        let tables = &self.tables;
        let names = tables
            .constraints
            .keys()
            .chain(&tables.format_only_constraints)
            .map(|n| ("tables.constraints", n))
            .chain(tables.primitives.iter().map(|n| ("tables.primitives", n)))
            .chain(tables.textual.iter().map(|n| ("tables.textual", n)))
            .chain(tables.aliases.iter().flat_map(|(from, to)| {
                [("tables.aliases", from), ("tables.aliases", to)]
            }))
            .chain(tables.factory_receivers.iter().map(|n| ("tables.factory_receivers", n)))
            .chain(tables.factories.keys().map(|n| ("tables.factories", n)));
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid_value(field, "names must not be empty"));
            }
        }

        for (name, kind) in &tables.factories {
            factory_rule(kind).ok_or_else(|| {
                ConfigError::invalid_value(
                    format!("tables.factories.{name}"),
                    format!("unknown outcome kind '{kind}'"),
                )
            })?;
        }

        Ok(())
    }

    /// Builds the lookup tables: the built-in tables plus the `[tables]`
    /// additions.
    ///
    /// Factories naming an unknown outcome kind are skipped; [`validate`]
    /// rejects them first.
    ///
    /// [`validate`]: HeronConfig::validate
    #[must_use]
    pub fn tables(&self) -> AnalysisTables {
        let extra = &self.tables;

        let mut constraints = ConstraintTable::builtin();
        for (name, types) in &extra.constraints {
            constraints = constraints.with_typed(name, types.iter().cloned());
        }
        for name in &extra.format_only_constraints {
            constraints = constraints.with_format_only(name);
        }

        let mut types = TypeTable::builtin();
        for name in &extra.primitives {
            types = types.with_primitive(name);
        }
        for name in &extra.textual {
            types = types.with_textual(name);
        }
        for (from, to) in &extra.aliases {
            types = types.with_alias(from, to);
        }

        let mut factories = FactoryTable::builtin();
        for receiver in &extra.factory_receivers {
            factories = factories.with_receiver(receiver);
        }
        for (name, kind) in &extra.factories {
            if let Some(rule) = factory_rule(kind) {
                factories = factories.with_factory(name, rule);
            }
        }

        AnalysisTables::builtin()
            .with_constraints(constraints)
            .with_types(types)
            .with_factories(factories)
    }
}

fn factory_rule(kind: &str) -> Option<FactoryRule> {
    if kind == "custom" {
        Some(FactoryRule::Custom)
    } else {
        OutcomeKind::from_label(kind).map(FactoryRule::Kind)
    }
}
