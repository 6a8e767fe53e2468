use chrono::Datelike;

// Build date for `startm --version`.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let today = chrono::Local::now().date_naive();
    println!("cargo:rustc-env=BUILD_YEAR={}", today.year());
    println!("cargo:rustc-env=BUILD_MONTH={}", today.month());
    println!("cargo:rustc-env=BUILD_DAY={}", today.day());
}
