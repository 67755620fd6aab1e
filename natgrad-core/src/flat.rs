use candle_core::{Error, Result, Shape, Tensor, Var, backprop::GradStore};
use candle_nn::VarMap;

/// Flat view over a model's parameter tensors.
///
/// Variables are ordered by name, so for a fixed topology the flattening
/// order is deterministic and `flatten`/`unflatten_into` are exact inverses.
/// The view shares storage with the `VarMap` it was built from: writes done
/// through `unflatten_into` are immediately visible to the model's forward
/// passes.
pub struct FlatView {
    vars: Vec<Var>,
    total: usize,
}

impl FlatView {
    pub fn from_varmap(varmap: &VarMap) -> Self {
        let data = varmap.data().lock().unwrap();
        let mut named: Vec<(String, Var)> = data
            .iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect();
        named.sort_by(|a, b| a.0.cmp(&b.0));
        let vars: Vec<Var> = named.into_iter().map(|(_, var)| var).collect();
        let total = vars.iter().map(|v| v.elem_count()).sum();
        Self { vars, total }
    }

    pub fn total_len(&self) -> usize {
        self.total
    }

    /// Concatenates every parameter tensor into one flat vector.
    ///
    /// The result owns its storage; a view aliasing a variable would be
    /// silently rewritten by the next `unflatten_into`.
    pub fn flatten(&self) -> Result<Tensor> {
        let flats = self
            .vars
            .iter()
            .map(|v| v.as_tensor().detach().flatten_all())
            .collect::<Result<Vec<_>>>()?;
        Tensor::cat(&flats, 0)?.copy()
    }

    /// Writes `flat` back into the parameter tensors, in place.
    pub fn unflatten_into(&self, flat: &Tensor) -> Result<()> {
        let len = flat.dims1()?;
        if len != self.total {
            return Err(Error::UnexpectedShape {
                msg: "flat parameter vector does not match the model's parameter count".to_string(),
                expected: Shape::from(self.total),
                got: Shape::from(len),
            });
        }
        let mut offset = 0;
        for var in self.vars.iter() {
            let count = var.elem_count();
            let chunk = flat.narrow(0, offset, count)?.reshape(var.shape())?;
            var.set(&chunk)?;
            offset += count;
        }
        Ok(())
    }

    /// Flattens a gradient store with the same ordering as `flatten`.
    ///
    /// Parameters the differentiated scalar does not reach get zeros.
    pub fn flatten_grads(&self, grads: &GradStore) -> Result<Tensor> {
        let mut flats = Vec::with_capacity(self.vars.len());
        for var in self.vars.iter() {
            match grads.get_id(var.id()) {
                Some(grad) => flats.push(grad.flatten_all()?),
                None => flats.push(Tensor::zeros(var.elem_count(), var.dtype(), var.device())?),
            }
        }
        Tensor::cat(&flats, 0)
    }
}

#[cfg(test)]
mod test {
    use super::FlatView;
    use candle_core::{DType, Device, Result};
    use candle_nn::{VarBuilder, VarMap, linear};

    fn test_varmap() -> Result<(VarMap, FlatView)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let _l0 = linear(3, 4, vb.pp("l0"))?;
        let _l1 = linear(4, 2, vb.pp("l1"))?;
        let view = FlatView::from_varmap(&varmap);
        Ok((varmap, view))
    }

    #[test]
    fn flatten_round_trip_is_identity() -> Result<()> {
        let (_varmap, view) = test_varmap()?;
        assert_eq!(view.total_len(), 3 * 4 + 4 + 4 * 2 + 2);
        let before = view.flatten()?;
        view.unflatten_into(&before)?;
        let after = view.flatten()?;
        assert_eq!(before.to_vec1::<f32>()?, after.to_vec1::<f32>()?);
        Ok(())
    }

    #[test]
    fn flat_arithmetic_matches_per_tensor_arithmetic() -> Result<()> {
        let (varmap, view) = test_varmap()?;
        let expected: Vec<Vec<f32>> = varmap
            .all_vars()
            .iter()
            .map(|v| {
                v.flatten_all()
                    .unwrap()
                    .to_vec1::<f32>()
                    .unwrap()
                    .iter()
                    .map(|x| x + 2.0)
                    .collect()
            })
            .collect();
        let shifted = (view.flatten()? + 2.0)?;
        view.unflatten_into(&shifted)?;
        let got: Vec<Vec<f32>> = varmap
            .all_vars()
            .iter()
            .map(|v| v.flatten_all().unwrap().to_vec1::<f32>().unwrap())
            .collect();
        assert_eq!(expected, got);
        Ok(())
    }

    #[test]
    fn unflatten_rejects_wrong_length() -> Result<()> {
        let (_varmap, view) = test_varmap()?;
        let short = candle_core::Tensor::zeros(view.total_len() - 1, DType::F32, &Device::Cpu)?;
        assert!(view.unflatten_into(&short).is_err());
        Ok(())
    }
}
