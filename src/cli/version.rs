/// Display version information
pub fn execute() {
    println!("psi-sum {}", env!("CARGO_PKG_VERSION"));
    println!("Private Intersection-Sum over Ristretto255 and Paillier");
}
