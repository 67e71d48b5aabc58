fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ESP-IDF link arguments only apply to target builds; host tests skip them.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
