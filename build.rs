fn main() {
    // ESP-IDF environment propagation only applies to device builds.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
