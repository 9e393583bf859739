//! 测试与基准用的参数化网生成器.
use crate::graph::GraphError;
use crate::net::core::PetriNet;
use crate::net::structure::Place;

/// Ring of `n` places and `n` transitions: `p_i -> t_i -> p_{i+1 mod n}`,
/// with a single token on `p0`. Every transition fires exactly once per lap.
pub fn cycle_net(n: usize) -> Result<PetriNet, GraphError> {
    let mut net = PetriNet::new(format!("cycle-{n}"));
    for idx in 0..n {
        let tokens = u64::from(idx == 0);
        net.add_place(Place::with_tokens(format!("p{idx}"), tokens))?;
    }
    for idx in 0..n {
        let transition = format!("t{idx}");
        net.create_transition(transition.as_str())?;
        net.create_flow(&format!("p{idx}"), &transition, 1)?;
        net.create_flow(&transition, &format!("p{}", (idx + 1) % n), 1)?;
    }
    Ok(net)
}
