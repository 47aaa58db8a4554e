use terra_ngin::config::DemoConfig;

/// `terra-ngin [MODEL.obj [TEXTURE]]`, paths relative to `./assets`.
fn main() -> anyhow::Result<()> {
    let mut config = DemoConfig::default();
    let mut args = std::env::args().skip(1);
    if let Some(model_path) = args.next() {
        config.model_path = model_path;
    }
    if let Some(texture_path) = args.next() {
        config.model_texture_path = texture_path;
    }
    terra_ngin::app::run(config)
}
