//! Single-layer LSTM over a framed session. Gate layout `[i | f | g | o]`.

use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct LstmWeights {
    /// `[4H, D]`
    pub w_ih: Array2<f32>,
    /// `[4H, H]`
    pub w_hh: Array2<f32>,
    pub b_ih: Array1<f32>,
    pub b_hh: Array1<f32>,
}

impl LstmWeights {
    /// Uniform(-1/sqrt(H), 1/sqrt(H)) for every tensor.
    pub fn init<R: Rng + ?Sized>(input_dim: usize, hidden: usize, rng: &mut R) -> Self {
        let k = 1.0 / (hidden as f32).sqrt();
        let dist = Uniform::new_inclusive(-k, k);
        Self {
            w_ih: Array2::from_shape_fn((4 * hidden, input_dim), |_| dist.sample(rng)),
            w_hh: Array2::from_shape_fn((4 * hidden, hidden), |_| dist.sample(rng)),
            b_ih: Array1::from_shape_fn(4 * hidden, |_| dist.sample(rng)),
            b_hh: Array1::from_shape_fn(4 * hidden, |_| dist.sample(rng)),
        }
    }

    pub fn zeros(input_dim: usize, hidden: usize) -> Self {
        Self {
            w_ih: Array2::zeros((4 * hidden, input_dim)),
            w_hh: Array2::zeros((4 * hidden, hidden)),
            b_ih: Array1::zeros(4 * hidden),
            b_hh: Array1::zeros(4 * hidden),
        }
    }

    pub fn hidden(&self) -> usize {
        self.w_hh.ncols()
    }

    pub fn input_dim(&self) -> usize {
        self.w_ih.ncols()
    }
}

/// Activations of one timestep, kept for backprop.
pub(crate) struct Step {
    x: Array1<f32>,
    i: Array1<f32>,
    f: Array1<f32>,
    g: Array1<f32>,
    o: Array1<f32>,
    c: Array1<f32>,
    h: Array1<f32>,
}

pub(crate) struct Trace {
    steps: Vec<Step>,
    hidden: usize,
}

impl Trace {
    pub(crate) fn last_hidden(&self) -> Array1<f32> {
        self.steps
            .last()
            .map(|s| s.h.clone())
            .unwrap_or_else(|| Array1::zeros(self.hidden))
    }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

fn cell(
    w: &LstmWeights,
    x: ArrayView1<'_, f32>,
    h_prev: &Array1<f32>,
    c_prev: &Array1<f32>,
) -> (Array1<f32>, Array1<f32>, Array1<f32>, Array1<f32>, Array1<f32>, Array1<f32>) {
    let hs = w.hidden();
    let gates = w.w_ih.dot(&x) + &w.b_ih + w.w_hh.dot(h_prev) + &w.b_hh;
    let i = gates.slice(s![0..hs]).mapv(sigmoid);
    let f = gates.slice(s![hs..2 * hs]).mapv(sigmoid);
    let g = gates.slice(s![2 * hs..3 * hs]).mapv(f32::tanh);
    let o = gates.slice(s![3 * hs..4 * hs]).mapv(sigmoid);
    let c = &f * c_prev + &i * &g;
    let h = &o * &c.mapv(f32::tanh);
    (i, f, g, o, c, h)
}

/// Final hidden state after the first `steps` rows. No activations are kept.
pub(crate) fn run(w: &LstmWeights, seq: ArrayView2<'_, f32>, steps: usize) -> Array1<f32> {
    let hs = w.hidden();
    let mut h = Array1::zeros(hs);
    let mut c = Array1::zeros(hs);
    for t in 0..steps.min(seq.nrows()) {
        let (_, _, _, _, c_t, h_t) = cell(w, seq.row(t), &h, &c);
        h = h_t;
        c = c_t;
    }
    h
}

/// Same arithmetic as [`run`], recording every step.
pub(crate) fn forward(w: &LstmWeights, seq: ArrayView2<'_, f32>, steps: usize) -> Trace {
    let hs = w.hidden();
    let steps = steps.min(seq.nrows());
    let mut trace = Trace {
        steps: Vec::with_capacity(steps),
        hidden: hs,
    };
    let mut h = Array1::zeros(hs);
    let mut c = Array1::zeros(hs);
    for t in 0..steps {
        let x = seq.row(t);
        let (i, f, g, o, c_t, h_t) = cell(w, x, &h, &c);
        h = h_t.clone();
        c = c_t.clone();
        trace.steps.push(Step {
            x: x.to_owned(),
            i,
            f,
            g,
            o,
            c: c_t,
            h: h_t,
        });
    }
    trace
}

/// Backprop through time from `dh_last` (dL/dh at the final step), accumulating into `grads`.
pub(crate) fn backward(w: &LstmWeights, trace: &Trace, dh_last: &Array1<f32>, grads: &mut LstmWeights) {
    let hs = trace.hidden;
    let zeros = Array1::<f32>::zeros(hs);
    let mut dh = dh_last.clone();
    let mut dc_next = Array1::<f32>::zeros(hs);
    let mut gates_grad = Array1::<f32>::zeros(4 * hs);

    for t in (0..trace.steps.len()).rev() {
        let st = &trace.steps[t];
        let (h_prev, c_prev) = if t == 0 {
            (&zeros, &zeros)
        } else {
            (&trace.steps[t - 1].h, &trace.steps[t - 1].c)
        };

        let tanh_c = st.c.mapv(f32::tanh);
        let d_o = &dh * &tanh_c * &st.o.mapv(|v| v * (1.0 - v));
        let dc = &dh * &st.o * &tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
        let d_i = &dc * &st.g * &st.i.mapv(|v| v * (1.0 - v));
        let d_f = &dc * c_prev * &st.f.mapv(|v| v * (1.0 - v));
        let d_g = &dc * &st.i * &st.g.mapv(|v| 1.0 - v * v);

        gates_grad.slice_mut(s![0..hs]).assign(&d_i);
        gates_grad.slice_mut(s![hs..2 * hs]).assign(&d_f);
        gates_grad.slice_mut(s![2 * hs..3 * hs]).assign(&d_g);
        gates_grad.slice_mut(s![3 * hs..4 * hs]).assign(&d_o);

        let col = gates_grad.view().insert_axis(Axis(1));
        general_mat_mul(1.0, &col, &st.x.view().insert_axis(Axis(0)), 1.0, &mut grads.w_ih);
        general_mat_mul(1.0, &col, &h_prev.view().insert_axis(Axis(0)), 1.0, &mut grads.w_hh);
        grads.b_ih += &gates_grad;
        grads.b_hh += &gates_grad;

        dh = w.w_hh.t().dot(&gates_grad);
        dc_next = &dc * &st.f;
    }
}
