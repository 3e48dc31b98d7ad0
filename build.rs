// Build script for OnTop
// Embeds the Windows application manifest

fn main() {
    // Only run on Windows
    #[cfg(target_os = "windows")]
    {
        let rc_path = std::path::Path::new("resources/ontop.rc");
        if rc_path.exists() {
            embed_resource::compile("resources/ontop.rc", embed_resource::NONE);
        }

        println!("cargo:rustc-link-lib=user32");
    }

    println!("cargo:rerun-if-changed=resources/");
    println!("cargo:rerun-if-changed=build.rs");
}
