use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=LIBFT260_DIR");

    // Only the vendor backend needs the native library.
    if env::var_os("CARGO_FEATURE_LIBFT260").is_none() {
        return;
    }

    match env::var("LIBFT260_DIR") {
        Ok(dir) => {
            let dir = PathBuf::from(dir);
            if !dir.exists() {
                println!(
                    "cargo:warning=LIBFT260_DIR does not exist: {}",
                    dir.display()
                );
            }
            println!("cargo:rustc-link-search=native={}", dir.display());
        }
        Err(_) => {
            println!("cargo:warning=LIBFT260_DIR not set, linker will search standard paths");
        }
    }
}
