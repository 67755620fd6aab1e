use candle_core::{Result, Tensor};
use candle_nn::{Linear, Module, VarBuilder, VarMap, linear};
use either::Either;

#[derive(Debug, Clone)]
pub struct TanhLayer;

impl Module for TanhLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.tanh()
    }
}

#[derive(Debug, Clone)]
pub struct MlpLayer(pub Either<Linear, TanhLayer>);

impl MlpLayer {
    pub fn linear(linear: Linear) -> Self {
        Self(Either::Left(linear))
    }

    pub fn activation() -> Self {
        Self(Either::Right(TanhLayer))
    }
}

impl Module for MlpLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.0 {
            Either::Left(linear) => linear.forward(xs),
            Either::Right(activation) => activation.forward(xs),
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct Mlp {
    layers: Vec<MlpLayer>,
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?
        }
        Ok(xs)
    }
}

impl Mlp {
    pub fn add_layer(mut self, layer: MlpLayer) -> Self {
        self.layers.push(layer);
        self
    }
}

/// Builds a feed-forward stack of linear layers with tanh in between; the
/// last entry of `layers` is the output layer and stays linear.
pub fn build_mlp(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Mlp> {
    let mut last_dim = input_dim;
    let mut nn = Mlp::default();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        let layer = linear(last_dim, *layer_size, vb.pp(&layer_pp))?;
        if layer_idx == num_layers - 1 {
            nn = nn.add_layer(MlpLayer::linear(layer));
        } else {
            nn = nn
                .add_layer(MlpLayer::linear(layer))
                .add_layer(MlpLayer::activation());
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}

/// Rescales an already-built layer's weight and zeroes its bias, in place.
///
/// Used on output layers so a fresh policy starts out near-deterministic
/// with low-magnitude outputs.
pub fn scale_layer(varmap: &VarMap, prefix: &str, layer_idx: usize, weight_scale: f64) -> Result<()> {
    let data = varmap.data().lock().unwrap();
    let weight_name = format!("{prefix}{layer_idx}.weight");
    let Some(weight) = data.get(&weight_name) else {
        candle_core::bail!("no layer weight registered under {weight_name}")
    };
    weight.set(&(weight.as_tensor() * weight_scale)?)?;
    let bias_name = format!("{prefix}{layer_idx}.bias");
    let Some(bias) = data.get(&bias_name) else {
        candle_core::bail!("no layer bias registered under {bias_name}")
    };
    bias.set(&bias.zeros_like()?)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{build_mlp, scale_layer};
    use candle_core::{DType, Device, Result, Tensor};
    use candle_nn::{Module, VarBuilder, VarMap};

    #[test]
    fn mlp_shapes_and_output_scaling() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = build_mlp(3, &[8, 8, 2], &vb, "pi")?;
        let xs = Tensor::zeros((5, 3), DType::F32, &device)?;
        let out = net.forward(&xs)?;
        assert_eq!(out.dims(), &[5, 2]);

        scale_layer(&varmap, "pi", 2, 0.0)?;
        // zero weight and bias on the output layer force a zero output
        let out = net.forward(&(xs + 1.0)?)?;
        assert_eq!(out.abs()?.sum_all()?.to_scalar::<f32>()?, 0.0);
        Ok(())
    }
}
