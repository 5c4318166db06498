//! Block summing for nodes with several inputs.

/*
Summing
=======

When several connections feed one node, their signals are added sample by
sample. Every echo in the graph converges on the sink this way:

    echo 0:  [ 0.0,  0.9,  0.0,  0.0 ]
    echo 1:  [ 0.0,  0.0,  0.0,  0.54]
    sink:    [ 0.0,  0.9,  0.0,  0.54]


Clipping Risk
-------------

Summing does not weight its inputs, so overlapping echoes of a loud source
can exceed the normal [-1.0, +1.0] range. Decaying echo gains keep the sum
bounded in practice; the device output clamps whatever remains.
*/

/// Add `input` into `acc` sample-by-sample.
#[inline]
pub fn sum_into(acc: &mut [f32], input: &[f32]) {
    debug_assert_eq!(acc.len(), input.len());

    for (a, &s) in acc.iter_mut().zip(input.iter()) {
        *a += s;
    }
}

/// Clamp a block into the [-1.0, 1.0] range a device expects.
#[inline]
pub fn hard_clip(signal: &mut [f32]) {
    for sample in signal.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
}
