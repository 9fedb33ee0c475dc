use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        PaddingConfig1d,
    },
    tensor::{
        activation::{sigmoid, tanh},
        backend::Backend,
        Distribution, Tensor,
    },
};

use crate::pipelines::sentiment::Mode;

/// Configuration to create a [QRNN layer](Layer)
#[derive(Config, Debug)]
pub struct LayerConfig {
    /// Width of the input features
    pub d_input: usize,

    /// Number of hidden channels
    pub d_hidden: usize,

    /// Number of timesteps each convolution sees
    #[config(default = 2)]
    pub window_size: usize,

    /// Probability of keeping the previous cell state in training mode
    #[config(default = 0.0)]
    pub zoneout: f64,
}

impl LayerConfig {
    /// Initialize a new QRNN layer
    pub fn init<B: Backend>(&self, device: &B::Device) -> Layer<B> {
        // Pad both sides by window - 1 and keep the first seq_len outputs, so timestep t only
        // sees inputs t - window + 1 ..= t
        let conv = Conv1dConfig::new(self.d_input, 3 * self.d_hidden, self.window_size)
            .with_padding(PaddingConfig1d::Explicit(self.window_size - 1))
            .init(device);

        Layer {
            conv,
            d_hidden: self.d_hidden,
            zoneout: self.zoneout,
        }
    }
}

/// A quasi-recurrent layer: a causal convolution computes candidate, forget and output gates
/// for every timestep at once, then a light fo-pooling recurrence mixes them over time.
#[derive(Module, Debug)]
pub struct Layer<B: Backend> {
    /// Convolution producing the Z, F and O gates
    pub conv: Conv1d<B>,

    /// Number of hidden channels
    pub d_hidden: usize,

    /// Zoneout probability
    pub zoneout: f64,
}

impl<B: Backend> Layer<B> {
    /// Apply the layer: [batch, seq, d_input] -> [batch, seq, d_hidden]
    pub fn forward(&self, x: Tensor<B, 3>, mode: Mode) -> Tensor<B, 3> {
        let [batch_size, seq_len, _] = x.dims();

        let gates = self
            .conv
            .forward(x.swap_dims(1, 2))
            .slice([0..batch_size, 0..3 * self.d_hidden, 0..seq_len])
            .swap_dims(1, 2);

        let gate = |i: usize| {
            gates.clone().slice([
                0..batch_size,
                0..seq_len,
                i * self.d_hidden..(i + 1) * self.d_hidden,
            ])
        };

        let z = tanh(gate(0));
        let f = self.zone_out(sigmoid(gate(1)), mode);
        let o = sigmoid(gate(2));

        self.fo_pool(z, f, o)
    }

    /// Force forget gates to one with the zoneout probability, preserving the previous state
    fn zone_out(&self, f: Tensor<B, 3>, mode: Mode) -> Tensor<B, 3> {
        if !mode.is_train() || self.zoneout <= 0.0 {
            return f;
        }

        let keep = Tensor::random(f.shape(), Distribution::Bernoulli(self.zoneout), &f.device());

        f.mul(keep.clone().neg().add_scalar(1.0)).add(keep)
    }

    /// c_t = f_t * c_{t-1} + (1 - f_t) * z_t and h_t = o_t * c_t, starting from c_0 = 0
    fn fo_pool(&self, z: Tensor<B, 3>, f: Tensor<B, 3>, o: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, seq_len, d_hidden] = z.dims();

        let mut c = Tensor::<B, 2>::zeros([batch_size, d_hidden], &z.device());
        let mut hidden: Vec<Tensor<B, 3>> = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let step = |gate: &Tensor<B, 3>| -> Tensor<B, 2> {
                gate.clone()
                    .slice([0..batch_size, t..t + 1, 0..d_hidden])
                    .squeeze(1)
            };

            let (z_t, f_t, o_t) = (step(&z), step(&f), step(&o));

            c = f_t.clone().mul(c) + f_t.neg().add_scalar(1.0).mul(z_t);
            hidden.push(o_t.mul(c.clone()).unsqueeze_dim(1));
        }

        Tensor::cat(hidden, 1)
    }

    /// The convolution weights, flattened, followed by the bias
    pub fn weights(&self) -> (Tensor<B, 1>, Option<Tensor<B, 1>>) {
        let weight = self.conv.weight.val().flatten(0, 2);
        let bias = self.conv.bias.as_ref().map(|bias| bias.val());

        (weight, bias)
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        module::Param,
        tensor::ElementConversion,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn keeps_sequence_shape() {
        let device = Default::default();
        let layer = LayerConfig::new(5, 7).init::<TestBackend>(&device);

        let x = Tensor::random([3, 4, 5], Distribution::Default, &device);

        assert_eq!(layer.forward(x, Mode::Eval).dims(), [3, 4, 7]);
    }

    #[test]
    fn matches_hand_computed_recurrence() {
        let device = Default::default();
        let mut layer = LayerConfig::new(1, 1).init::<TestBackend>(&device);

        // Kernel layout is [channels_out, channels_in, window] with gates ordered Z, F, O and
        // window index 1 being the current timestep
        layer.conv.weight = Param::from_tensor(Tensor::from_floats(
            [[[0.0, 1.0]], [[0.0, 0.0]], [[0.0, 0.0]]],
            &device,
        ));
        layer.conv.bias = Some(Param::from_tensor(Tensor::from_floats(
            [0.0, 0.0, 50.0],
            &device,
        )));

        // f = sigmoid(0) = 0.5, o = sigmoid(50) = 1, z_t = tanh(x_t)
        let x = Tensor::<TestBackend, 3>::from_floats([[[1.0], [2.0]]], &device);
        let h = layer.forward(x, Mode::Eval).into_data().convert::<f32>().value;

        let c1 = 0.5 * 1.0f32.tanh();
        let c2 = 0.5 * c1 + 0.5 * 2.0f32.tanh();

        assert!((h[0] - c1).abs() < 1e-5, "{h:?}");
        assert!((h[1] - c2).abs() < 1e-5, "{h:?}");
    }

    #[test]
    fn full_zoneout_freezes_the_state_while_training() {
        let device = Default::default();
        let layer = LayerConfig::new(2, 3)
            .with_zoneout(1.0)
            .init::<Autodiff<TestBackend>>(&device);

        let x = Tensor::<Autodiff<TestBackend>, 3>::from_floats(
            [[[1.0, -1.0], [0.5, 2.0], [-3.0, 1.0]]],
            &device,
        );

        // Every forget gate is forced to one, so the cell never leaves its zero start
        let magnitude = |mode: Mode| {
            layer
                .forward(x.clone(), mode)
                .abs()
                .sum()
                .into_scalar()
                .elem::<f32>()
        };

        assert_eq!(magnitude(Mode::Train), 0.0);
        assert!(magnitude(Mode::Eval) > 0.0);
    }

    #[test]
    fn is_causal() {
        let device = Default::default();
        let layer = LayerConfig::new(2, 3).init::<TestBackend>(&device);

        let a = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, 0.0], [0.5, 0.5], [0.0, 1.0]]],
            &device,
        );
        let b = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, 0.0], [0.5, 0.5], [9.0, -9.0]]],
            &device,
        );

        // Changing the last timestep must not affect earlier outputs
        let prefix = |x: Tensor<TestBackend, 3>| {
            layer.forward(x, Mode::Eval).slice([0..1, 0..2, 0..3])
        };

        assert_eq!(
            (prefix(a) - prefix(b)).abs().sum().into_scalar().elem::<f32>(),
            0.0
        );
    }
}
