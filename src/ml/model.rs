use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

// ─── Classifier ───────────────────────────────────────────────────────────────
/// What the trainer needs from a model: logits, and optionally a
/// weight penalty that is scaled and added to the loss.
pub trait Classifier<B: Backend> {
    /// images: [batch, channels, height, width] → logits: [batch, n_classes]
    fn logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Sum of squared regularized weights, if the model has any.
    fn weight_penalty(&self) -> Option<Tensor<B, 1>> {
        None
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ConvClassifierConfig {
    pub input_channels: usize,
    pub input_height:   usize,
    pub input_width:    usize,
    pub num_classes:    usize,
    /// Output channels of the three conv stages
    #[config(default = "[24, 48, 48]")]
    pub conv_channels:  [usize; 3],
    #[config(default = 5)]
    pub kernel_size:    usize,
    #[config(default = 64)]
    pub hidden_size:    usize,
    #[config(default = 0.5)]
    pub dropout:        f64,
}

impl ConvClassifierConfig {
    /// Spatial (height, width) after each conv + pool stage.
    ///
    /// Valid convolution shrinks each side by k - 1, the 2x2 pool
    /// halves it (rounding down). None if a stage collapses.
    pub fn stage_dims(&self) -> Option<[(usize, usize); 3]> {
        let shrink = |d: usize| -> Option<usize> {
            let conv = d.checked_sub(self.kernel_size.saturating_sub(1)).filter(|&c| c > 0)?;
            Some(conv / 2).filter(|&p| p > 0)
        };

        let mut dims = [(0, 0); 3];
        let (mut h, mut w) = (self.input_height, self.input_width);
        for stage in dims.iter_mut() {
            h = shrink(h)?;
            w = shrink(w)?;
            *stage = (h, w);
        }
        Some(dims)
    }

    /// Length of the flattened feature vector fed to the dense head
    pub fn flattened_size(&self) -> Option<usize> {
        let (h, w) = self.stage_dims()?[2];
        Some(self.conv_channels[2] * h * w)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.kernel_size == 0 {
            anyhow::bail!("kernel size must be positive");
        }
        if self.num_classes == 0 || self.input_channels == 0 {
            anyhow::bail!("input channels and class count must be positive");
        }
        if self.stage_dims().is_none() {
            anyhow::bail!(
                "input {}x{} is too small for three {}x{} conv + 2x2 pool stages",
                self.input_height,
                self.input_width,
                self.kernel_size,
                self.kernel_size
            );
        }
        Ok(())
    }

    /// Build the model. Call `validate` first for a readable error
    /// instead of a shape panic.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvClassifier<B> {
        let k = [self.kernel_size, self.kernel_size];
        let [c1, c2, c3] = self.conv_channels;
        let flat = self.flattened_size().unwrap_or(0);

        ConvClassifier {
            conv1:   Conv2dConfig::new([self.input_channels, c1], k).init(device),
            conv2:   Conv2dConfig::new([c1, c2], k).init(device),
            conv3:   Conv2dConfig::new([c2, c3], k).init(device),
            pool:    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            dense1:  LinearConfig::new(flat, self.hidden_size).init(device),
            dense2:  LinearConfig::new(self.hidden_size, self.num_classes).init(device),
        }
    }

    /// Layer table with output shapes and parameter counts.
    pub fn summary(&self) -> String {
        let mut rows: Vec<(String, String, usize)> = Vec::new();
        let k2 = self.kernel_size * self.kernel_size;
        let mut in_ch = self.input_channels;

        if let Some(dims) = self.stage_dims() {
            let (mut h, mut w) = (self.input_height, self.input_width);
            for (i, (&out_ch, &(ph, pw))) in self.conv_channels.iter().zip(dims.iter()).enumerate() {
                h = h + 1 - self.kernel_size;
                w = w + 1 - self.kernel_size;
                rows.push((
                    format!("conv{} (Conv2d)", i + 1),
                    format!("[{out_ch}, {h}, {w}]"),
                    in_ch * out_ch * k2 + out_ch,
                ));
                rows.push((format!("pool{} (MaxPool2d)", i + 1), format!("[{out_ch}, {ph}, {pw}]"), 0));
                (h, w, in_ch) = (ph, pw, out_ch);
            }
        }

        let flat = self.flattened_size().unwrap_or(0);
        rows.push(("flatten (Flatten)".into(), format!("[{flat}]"), 0));
        rows.push(("dropout (Dropout)".into(), format!("[{flat}]"), 0));
        rows.push((
            "dense1 (Linear)".into(),
            format!("[{}]", self.hidden_size),
            flat * self.hidden_size + self.hidden_size,
        ));
        rows.push((
            "dense2 (Linear)".into(),
            format!("[{}]", self.num_classes),
            self.hidden_size * self.num_classes + self.num_classes,
        ));

        let total: usize = rows.iter().map(|r| r.2).sum();
        let mut out = format!("{:<22}{:<20}{:>10}\n", "Layer (type)", "Output Shape", "Param #");
        for (name, shape, params) in &rows {
            out.push_str(&format!("{name:<22}{shape:<20}{params:>10}\n"));
        }
        out.push_str(&format!("Total params: {total}"));
        out
    }

    /// Total trainable parameters, as listed by `summary`
    pub fn param_count(&self) -> usize {
        let k2 = self.kernel_size * self.kernel_size;
        let [c1, c2, c3] = self.conv_channels;
        let flat = self.flattened_size().unwrap_or(0);
        (self.input_channels * c1 * k2 + c1)
            + (c1 * c2 * k2 + c2)
            + (c2 * c3 * k2 + c3)
            + (flat * self.hidden_size + self.hidden_size)
            + (self.hidden_size * self.num_classes + self.num_classes)
    }
}

#[derive(Module, Debug)]
pub struct ConvClassifier<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub conv3:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub dropout: Dropout,
    pub dense1:  Linear<B>,
    pub dense2:  Linear<B>,
}

impl<B: Backend> ConvClassifier<B> {
    /// images: [batch, C, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(images)));
        let x = self.pool.forward(relu(self.conv2.forward(x)));
        let x = self.pool.forward(relu(self.conv3.forward(x)));

        let x: Tensor<B, 2> = x.flatten(1, 3);
        let x = self.dropout.forward(x);
        let x = relu(self.dense1.forward(x));
        self.dense2.forward(x)
    }
}

impl<B: Backend> Classifier<B> for ConvClassifier<B> {
    fn logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(images)
    }

    // Only the dense kernels are regularized; biases and conv filters are not.
    fn weight_penalty(&self) -> Option<Tensor<B, 1>> {
        let d1 = self.dense1.weight.val().powf_scalar(2.0).sum();
        let d2 = self.dense2.weight.val().powf_scalar(2.0).sum();
        Some(d1 + d2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn small() -> ConvClassifierConfig {
        ConvClassifierConfig::new(1, 28, 28, 4)
            .with_kernel_size(3)
            .with_conv_channels([4, 8, 8])
            .with_hidden_size(16)
    }

    #[test]
    fn test_default_stage_dims_for_128() {
        let cfg = ConvClassifierConfig::new(3, 128, 128, 10);
        assert_eq!(cfg.stage_dims(), Some([(62, 62), (29, 29), (12, 12)]));
        assert_eq!(cfg.flattened_size(), Some(48 * 12 * 12));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_too_small_input_rejected() {
        let cfg = ConvClassifierConfig::new(1, 16, 16, 10);
        assert!(cfg.stage_dims().is_none());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: ConvClassifier<NdArray> = small().init(&device);
        let images = Tensor::<NdArray, 4>::zeros([2, 1, 28, 28], &device);
        assert_eq!(model.forward(images).dims(), [2, 4]);
    }

    #[test]
    fn test_param_count_matches_module() {
        let device = Default::default();
        let cfg = small();
        let model: ConvClassifier<NdArray> = cfg.init(&device);
        assert_eq!(model.num_params(), cfg.param_count());
        assert!(cfg.summary().ends_with(&format!("Total params: {}", cfg.param_count())));
    }

    #[test]
    fn test_weight_penalty_is_positive() {
        let device = Default::default();
        let model: ConvClassifier<NdArray> = small().init(&device);
        let penalty: f32 = model.weight_penalty().unwrap().into_scalar().elem();
        assert!(penalty > 0.0);
    }
}
