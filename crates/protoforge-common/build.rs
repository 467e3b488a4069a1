//! ---
//! pf_section: "01-core-functionality"
//! pf_subsection: "module"
//! pf_type: "source"
//! pf_scope: "code"
//! pf_description: "Shared configuration and process primitives."
//! pf_version: "v0.1.0"
//! pf_owner: "build-tooling"
//! ---
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Without git metadata vergen emits placeholder values.
    EmitBuilder::builder()
        .all_build()
        .all_cargo()
        .all_git()
        .emit()?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
