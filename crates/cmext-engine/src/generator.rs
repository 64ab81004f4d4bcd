use cmext_cmake::Generator;
use cmext_config::BuildSpec;

/// `Ninja` when the spec enables `+ninja`, `Unix Makefiles` otherwise.
pub fn select_generator(spec: &BuildSpec) -> Generator {
    if spec.variant("ninja") {
        Generator::Ninja
    } else {
        Generator::UnixMakefiles
    }
}
