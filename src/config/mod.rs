mod settings;

pub use settings::{
    CacheConfig, GitHubConfig, Settings, TemplateConfig, load_settings, load_settings_from,
};
