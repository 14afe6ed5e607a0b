/*
    p_success = n * p * (1 - p)^(n - 1)
    S = G * e^(-G),  G = n * p
 */

use log::info;

/// Probability that exactly one of `num_hosts` ready hosts transmits in a
/// slot when each transmits independently with probability `p`.
pub fn aloha_slot_success(num_hosts: usize, p: f64) -> f64 {
    if num_hosts == 0 {
        return 0.0;
    }
    let n = num_hosts as f64;
    n * p * (1.0 - p).powf(n - 1.0)
}

/// Poisson-approximated Slotted ALOHA throughput at offered load `g`
/// frames per slot.
pub fn aloha_throughput(g: f64) -> f64 {
    g * (-g).exp()
}

pub fn calculate_aloha_reference(num_hosts: usize, p: f64) -> (f64, f64) {
    let p_success = aloha_slot_success(num_hosts, p);
    let throughput = aloha_throughput(num_hosts as f64 * p);
    info!(
        "Theoretical Slotted ALOHA: n: {}, p: {}, p_success: {:.4}, throughput: {:.4}",
        num_hosts, p, p_success, throughput
    );
    (p_success, throughput)
}
