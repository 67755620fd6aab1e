use candle_core::{Error, Result};
use candle_nn::VarMap;
use std::path::{Path, PathBuf};

/// Persists the parameters as a safetensors file under `dir`.
pub fn save_policy(varmap: &VarMap, dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(Error::wrap)?;
    let path = dir.join(name);
    varmap.save(&path)?;
    Ok(path)
}

/// Loads previously saved parameters into an already-built model's varmap.
/// The names and shapes must match the current topology.
pub fn load_policy(varmap: &mut VarMap, path: &Path) -> Result<()> {
    varmap.load(path)
}

#[cfg(test)]
mod test {
    use super::{load_policy, save_policy};
    use candle_core::{DType, Device, Result};
    use candle_nn::{VarBuilder, VarMap, linear};

    #[test]
    fn save_and_reload_round_trips() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let _net = linear(4, 2, vb.pp("l0"))?;
        let dir = std::env::temp_dir().join("natgrad-checkpoint-test");
        let path = save_policy(&varmap, &dir, "model.safetensors")?;

        let before: Vec<Vec<f32>> = varmap
            .all_vars()
            .iter()
            .map(|v| v.flatten_all().unwrap().to_vec1().unwrap())
            .collect();

        let mut fresh = VarMap::new();
        let vb = VarBuilder::from_varmap(&fresh, DType::F32, &device);
        let _net = linear(4, 2, vb.pp("l0"))?;
        load_policy(&mut fresh, &path)?;
        let after: Vec<Vec<f32>> = fresh
            .all_vars()
            .iter()
            .map(|v| v.flatten_all().unwrap().to_vec1().unwrap())
            .collect();

        let mut before_sorted = before;
        let mut after_sorted = after;
        before_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        after_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(before_sorted, after_sorted);
        std::fs::remove_dir_all(&dir).ok();
        Ok(())
    }
}
